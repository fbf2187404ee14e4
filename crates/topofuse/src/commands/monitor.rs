//! Monitor command handler.

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use topofuse_core::{Aggregator, CorrelatedDevice};

use crate::cli::{GlobalOpts, MonitorArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Device")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Switch")]
    switch: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Sent")]
    sent: String,
    #[tabled(rename = "Received")]
    received: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl DeviceRow {
    fn new(d: &CorrelatedDevice, color: bool) -> Self {
        Self {
            id: d.id.clone(),
            name: output::or_dash(d.name.as_deref()),
            kind: d
                .classification
                .as_ref()
                .map_or_else(|| "-".into(), |c| format!("{} {}", c.icon, c.kind)),
            risk: output::risk(d.risk, color),
            switch: output::or_dash(d.switch_id.as_deref()),
            port: output::or_dash(d.port.as_deref()),
            sent: output::bytes(d.traffic.map(|t| t.bytes_sent)),
            received: output::bytes(d.traffic.map(|t| t.bytes_received)),
            last_seen: d.last_seen.map_or_else(
                || "-".into(),
                |ts| ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
        }
    }
}

pub async fn handle(
    aggregator: &Aggregator,
    args: &MonitorArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let mut devices = aggregator.monitored_devices(cancel).await?;
    if args.active_only {
        devices.retain(|d| d.is_active);
    }

    let color = output::should_color(global.color);
    let rendered = output::render_list(
        global.output,
        &devices,
        |d| DeviceRow::new(d, color),
        |d| d.id.clone(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
