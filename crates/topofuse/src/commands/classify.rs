//! Classify command handler. Needs no vendor connection.

use tracing::{debug, warn};

use topofuse_core::{ClassificationEngine, ClassificationResult};

use crate::cli::{ClassifyArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

fn detail(c: &ClassificationResult) -> String {
    [
        format!("Kind:         {} {}", c.icon, c.kind),
        format!("Category:     {}", c.category),
        format!("Risk:         {}", c.risk()),
        format!("Confidence:   {}", c.confidence),
        format!("Matched by:   {}", c.source),
        format!("Manufacturer: {}", output::or_dash(c.manufacturer.as_deref())),
    ]
    .join("\n")
}

pub fn handle(args: &ClassifyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let engine = engine(global)?;
    let result = engine.classify(
        &args.mac,
        args.hostname.as_deref(),
        args.manufacturer.as_deref(),
    );

    let rendered = output::render_single(global.output, &result, detail, |c| c.kind.to_string())?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Built-in tables plus the active profile's OUI entries. A missing config
/// file or default profile falls back to the built-in tables; a profile
/// named with `--profile` must exist.
fn engine(global: &GlobalOpts) -> Result<ClassificationEngine, CliError> {
    let cfg = super::load_config(global)?;
    let extra = match cfg.profile(global.profile.as_deref()) {
        Ok((_, profile)) => profile.classification.oui.clone(),
        Err(e) if global.profile.is_some() => return Err(e.into()),
        Err(_) => {
            debug!("no active profile, using built-in tables");
            Vec::new()
        }
    };

    let (engine, rejected) = ClassificationEngine::with_extra_oui(extra);
    for entry in &rejected {
        warn!(prefix = %entry.prefix, "ignoring malformed OUI entry");
    }
    Ok(engine)
}
