use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One organization visible to the API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudOrganization {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One network (site) inside an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudNetwork {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub product_types: Vec<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CloudNetwork {
    /// Whether the network hosts any of `types` (case-insensitive).
    /// An empty filter matches everything.
    pub fn has_any_product(&self, types: &[String]) -> bool {
        types.is_empty()
            || self
                .product_types
                .iter()
                .any(|p| types.iter().any(|t| t.eq_ignore_ascii_case(p)))
    }
}
