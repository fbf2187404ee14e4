mod cli;
mod commands;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose, cli.global.log_json);

    // Ctrl-C cancels in-flight discovery; the handler returns `Cancelled`.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    if let Err(err) = run(cli, &cancel).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<(), CliError> {
    let global = &cli.global;
    match cli.command {
        // No vendor connection needed
        Command::Config(ref args) => commands::config_cmd::handle(args, global),
        Command::Classify(ref args) => commands::classify::handle(args, global),

        Command::Completions(ref args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "topofuse", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let aggregator = commands::build_aggregator(global, &cmd)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &aggregator, global, cancel).await
        }
    }
}
