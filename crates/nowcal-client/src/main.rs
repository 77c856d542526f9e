//! nowcal CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use nowcal_client::cli::Cli;
use nowcal_client::commands::events::{self, Listing};
use nowcal_client::config::{ClientConfig, Settings};
use nowcal_client::error::ClientResult;
use nowcal_core::{TracingConfig, init_tracing};

/// Exit status when the hour has no events.
const EXIT_NO_EVENTS: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = TracingConfig::cli(cli.debug).with_format(cli.log_format.into());
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(Listing::Events(_)) => ExitCode::SUCCESS,
        Ok(Listing::Empty) => ExitCode::from(EXIT_NO_EVENTS),
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<Listing> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    let settings = Settings::resolve(&cli, &config)?;
    events::show(&settings).await
}
