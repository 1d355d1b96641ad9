//! `artcache` command-line entry point

mod cli;
mod commands;
mod errors;
mod tracing;

use crate::tracing::TracingConfig;
use std::process::ExitCode;

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> miette::Result<ExitCode> {
    let cli = cli::parse();
    let settings = cli.settings()?;

    let tracing_config = TracingConfig {
        format: cli.log_format,
        ..Default::default()
    }
    .with_level(cli.level, settings.verbose);
    crate::tracing::init_tracing(tracing_config)?;

    commands::execute(cli.command, &settings).await
}
