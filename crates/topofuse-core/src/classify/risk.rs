use crate::model::{Category, RiskLevel};

/// Fixed risk tier per device category.
///
/// Total over `Category`; uncategorized devices get the explicit
/// `RiskLevel::Unknown` rather than a guessed tier.
pub fn risk_tier(category: Category) -> RiskLevel {
    match category {
        Category::Payment => RiskLevel::Critical,
        Category::PointOfSale | Category::NetworkInfrastructure => RiskLevel::High,
        Category::Security | Category::Compute | Category::Iot => RiskLevel::Medium,
        Category::Peripheral | Category::Media | Category::Mobile => RiskLevel::Low,
        Category::Unknown => RiskLevel::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::model::DeviceKind;

    #[test]
    fn payment_is_critical() {
        assert_eq!(risk_tier(DeviceKind::PaymentTerminal.category()), RiskLevel::Critical);
        assert_eq!(risk_tier(DeviceKind::PosTerminal.category()), RiskLevel::High);
        assert_eq!(risk_tier(DeviceKind::Unknown.category()), RiskLevel::Unknown);
    }

    #[test]
    fn only_unknown_category_is_unscored() {
        for category in Category::iter() {
            let tier = risk_tier(category);
            assert_eq!(tier == RiskLevel::Unknown, category == Category::Unknown, "{category}");
        }
    }
}
