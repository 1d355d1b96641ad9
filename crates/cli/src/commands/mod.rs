//! Subcommand implementations

mod check;
mod run;
mod transfer;

use crate::cli::Commands;
use artcache_cache::CacheSettings;
use std::process::ExitCode;

pub async fn execute(command: Commands, settings: &CacheSettings) -> miette::Result<ExitCode> {
    match command {
        Commands::Check => check::execute(settings),
        Commands::Retrieve { hash } => transfer::retrieve(settings, &hash).await,
        Commands::Store { hash } => transfer::store(settings, &hash).await,
        Commands::Run { hash, command } => run::execute(settings, &hash, &command).await,
    }
}

/// Write a command result to stdout
#[allow(clippy::print_stdout)]
fn emit(line: &str) {
    println!("{line}");
}
