//! Topology command handlers.

use std::fmt::Write as _;

use tabled::Tabled;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use topofuse_core::{
    Aggregator, CanonicalGraph, CanonicalLink, CanonicalNode, Discovery,
    ScopeFilter, TopologyQuery,
};

use crate::cli::{CloudScopeArgs, GlobalOpts, OutputFormat, TopologyArgs, TopologySource, TopologyView};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Group")]
    group: String,
}

impl NodeRow {
    fn new(n: &CanonicalNode, color: bool) -> Self {
        Self {
            id: n.id.clone(),
            name: n.name.clone(),
            kind: n.kind.to_string(),
            status: output::node_status(n.status, color),
            model: output::or_dash(n.model.as_deref()),
            address: output::or_dash(n.address.as_deref()),
            group: n.group.clone(),
        }
    }
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Port")]
    source_port: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Port")]
    target_port: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Mbps")]
    bandwidth: String,
}

impl LinkRow {
    fn new(l: &CanonicalLink, color: bool) -> Self {
        Self {
            source: l.source.clone(),
            source_port: output::or_dash(l.source_port.as_deref()),
            target: l.target.clone(),
            target_port: output::or_dash(l.target_port.as_deref()),
            kind: l.kind.to_string(),
            status: output::link_status(l.status, color),
            bandwidth: l
                .bandwidth_mbps
                .map_or_else(|| "-".into(), |b| b.to_string()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    aggregator: &Aggregator,
    args: &TopologyArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let query = query_for(&args.source);
    let discovery = aggregator.topology(&query, cancel).await?;

    let graph = if args.strict {
        discovery.into_result()?
    } else {
        report_failures(&discovery);
        discovery.data
    };

    let color = output::should_color(global.color);
    let rendered = render(&graph, global.output, args.view, color)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn query_for(source: &TopologySource) -> TopologyQuery {
    match source {
        TopologySource::Firewall => TopologyQuery::Firewall,
        TopologySource::Switch => TopologyQuery::Switch,
        TopologySource::Cloud(scope) => TopologyQuery::Cloud(scope_filter(scope)),
    }
}

fn scope_filter(args: &CloudScopeArgs) -> ScopeFilter {
    let mut scope = ScopeFilter::default();
    for org in &args.organizations {
        scope = scope.organization(org);
    }
    for network in &args.networks {
        scope = scope.network(network);
    }
    for product in &args.product_types {
        scope = scope.product_type(product);
    }
    if args.no_ports {
        scope = scope.without_ports();
    }
    scope
}

/// Non-strict runs keep the healthy subset; failed branches are logged.
fn report_failures<T>(discovery: &Discovery<T>) {
    for failure in &discovery.failures {
        warn!(scope = %failure.scope, id = %failure.id, kind = %failure.kind, "partial result: {}", failure.message);
    }
}

fn render(
    graph: &CanonicalGraph,
    format: OutputFormat,
    view: TopologyView,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let mut out = String::new();
            if view != TopologyView::Links {
                let rows: Vec<_> = graph.nodes.iter().map(|n| NodeRow::new(n, color)).collect();
                out.push_str(&output::render_table(&rows));
            }
            if view == TopologyView::All {
                out.push('\n');
            }
            if view != TopologyView::Nodes {
                let rows: Vec<_> = graph.links.iter().map(|l| LinkRow::new(l, color)).collect();
                out.push_str(&output::render_table(&rows));
            }
            let _ = write!(
                out,
                "\n{} nodes, {} links from {} at {}",
                graph.nodes.len(),
                graph.links.len(),
                graph.metadata.source,
                graph.metadata.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            );
            Ok(out)
        }
        OutputFormat::Plain => {
            let ids: Vec<&str> = match view {
                TopologyView::Links => graph.links.iter().map(|l| l.id.as_str()).collect(),
                TopologyView::Nodes | TopologyView::All => {
                    graph.nodes.iter().map(|n| n.id.as_str()).collect()
                }
            };
            Ok(ids.join("\n"))
        }
        structured => output::render_structured(structured, graph),
    }
}
