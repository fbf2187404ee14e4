//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&super::config_file(global).display().to_string(), global.quiet);
        }
        ConfigCommand::Show => {
            let cfg = super::load_config(global)?.redacted();
            let rendered = match global.output {
                OutputFormat::Table | OutputFormat::Plain => cfg.to_toml()?,
                structured => output::render_structured(structured, &cfg)?,
            };
            output::print_output(&rendered, global.quiet);
        }
    }
    Ok(())
}
