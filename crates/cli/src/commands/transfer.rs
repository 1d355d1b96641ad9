//! One-off `retrieve` and `store` against the remote cache

use super::emit;
use crate::errors::CliError;
use artcache_cache::{CacheMode, CacheSettings, LocalReason, RunOutcome, run_tasks};
use std::process::ExitCode;
use tracing::info;

pub async fn retrieve(settings: &CacheSettings, hash: &str) -> miette::Result<ExitCode> {
    let cache_dir = settings.cache_dir();
    let outcome = run_tasks(settings, |cache| async move {
        match cache {
            Some(cache) => cache.retrieve(hash, &cache_dir).await,
            None => false,
        }
    })
    .await;

    finish(outcome, "hit", "miss")
}

pub async fn store(settings: &CacheSettings, hash: &str) -> miette::Result<ExitCode> {
    let cache_dir = settings.cache_dir();
    let outcome = run_tasks(settings, |cache| async move {
        match cache {
            Some(cache) => cache.store(hash, &cache_dir).await,
            None => false,
        }
    })
    .await;

    finish(outcome, "stored", "skipped")
}

fn finish(outcome: RunOutcome<bool>, yes: &str, no: &str) -> miette::Result<ExitCode> {
    match outcome.mode {
        CacheMode::Local {
            reason: LocalReason::Misconfigured(message),
        } => return Err(CliError::remote_failed(message).into()),
        CacheMode::Local {
            reason: LocalReason::Disabled,
        } => info!("Remote cache is disabled"),
        CacheMode::Remote => {}
    }

    emit(if outcome.result { yes } else { no });

    match outcome.failure {
        Some(message) => Err(CliError::remote_failed(message).into()),
        None => Ok(ExitCode::SUCCESS),
    }
}
