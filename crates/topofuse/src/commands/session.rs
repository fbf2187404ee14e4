//! Session command handlers.

use serde::Serialize;
use tabled::Tabled;

use topofuse_core::{Aggregator, SessionState, Vendor};

use crate::cli::{GlobalOpts, SessionArgs, SessionCommand, VendorArg};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct SessionStatus {
    vendor: Vendor,
    /// `None` for vendors keyed per request.
    state: Option<SessionState>,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Session")]
    state: String,
}

fn row(s: &SessionStatus) -> SessionRow {
    SessionRow {
        vendor: s.vendor.to_string(),
        state: s
            .state
            .map_or_else(|| "n/a (keyed per request)".into(), |st| st.to_string()),
    }
}

fn to_vendor(arg: VendorArg) -> Vendor {
    match arg {
        VendorArg::Firewall => Vendor::FirewallController,
        VendorArg::Switch => Vendor::DirectSwitch,
        VendorArg::Cloud => Vendor::CloudSwitch,
    }
}

pub async fn handle(
    aggregator: &Aggregator,
    args: &SessionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SessionCommand::Status { vendor: target } => {
            let vendors = match target {
                Some(arg) => vec![to_vendor(arg)],
                None => aggregator.configured_vendors(),
            };
            let mut statuses = Vec::with_capacity(vendors.len());
            for v in vendors {
                statuses.push(SessionStatus {
                    vendor: v,
                    state: aggregator.session_state(v).await?,
                });
            }
            let rendered = output::render_list(
                global.output,
                &statuses,
                row,
                |s| s.vendor.to_string(),
            )?;
            output::print_output(&rendered, global.quiet);
        }
        SessionCommand::Logout { vendor: target } => {
            let v = to_vendor(target);
            aggregator.logout(v).await?;
            if !global.quiet {
                eprintln!("Logged out of {v}");
            }
        }
    }
    Ok(())
}
