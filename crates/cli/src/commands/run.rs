//! Run one task through the local and remote cache
//!
//! The lookup order is the local commit marker, then the remote store. On a
//! miss the command runs with its output directory exported, and a
//! successful result is committed locally and handed to the remote cache.

use crate::errors::CliError;
use artcache_cache::engine::commit_name;
use artcache_cache::{CacheSettings, RemoteCache, run_tasks};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitCode, ExitStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hash of the task being run
pub const HASH_VAR: &str = "ARTCACHE_HASH";
/// Directory the task should write its outputs to
pub const OUTPUT_DIR_VAR: &str = "ARTCACHE_OUTPUT_DIR";

pub async fn execute(
    settings: &CacheSettings,
    hash: &str,
    command: &[String],
) -> miette::Result<ExitCode> {
    let cache_dir = settings.cache_dir();
    let outcome = run_tasks(settings, |cache| run_task(cache, hash, &cache_dir, command)).await;

    if outcome.failure.is_some() {
        debug!(%hash, "Task result was not shared with the remote cache");
    }
    outcome.result
}

async fn run_task(
    cache: Option<Arc<dyn RemoteCache>>,
    hash: &str,
    cache_dir: &Path,
    command: &[String],
) -> miette::Result<ExitCode> {
    let commit = cache_dir.join(commit_name(hash));
    if tokio::fs::try_exists(&commit).await.unwrap_or(false) {
        info!(%hash, "Local cache hit");
        return Ok(ExitCode::SUCCESS);
    }

    let remote_hit = match &cache {
        Some(cache) => cache.retrieve(hash, cache_dir).await,
        None => false,
    };
    if remote_hit {
        info!(%hash, "Remote cache hit");
        return Ok(ExitCode::SUCCESS);
    }

    let output_dir = cache_dir.join(hash);
    match tokio::fs::remove_dir_all(&output_dir).await {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            return Err(CliError::file_error("remove", &output_dir, e).into());
        }
        _ => {}
    }
    tokio::fs::create_dir_all(&output_dir)
        .await
        .map_err(|e| CliError::file_error("create", &output_dir, e))?;

    let Some((program, args)) = command.split_first() else {
        return Err(miette::miette!("No command given"));
    };
    debug!(%hash, %program, ?args, "Cache miss, running command");
    let status = tokio::process::Command::new(program)
        .args(args)
        .env(HASH_VAR, hash)
        .env(OUTPUT_DIR_VAR, &output_dir)
        .status()
        .await
        .map_err(|e| CliError::spawn_failed(program, e))?;

    if !status.success() {
        warn!(%hash, %status, "Command failed, nothing cached");
        return Ok(exit_code(status));
    }

    tokio::fs::write(&commit, "true")
        .await
        .map_err(|e| CliError::file_error("write", &commit, e))?;

    if let Some(cache) = cache {
        // Drained by the runner before the process exits
        drop(cache.store(hash, cache_dir));
    }
    Ok(ExitCode::SUCCESS)
}

fn exit_code(status: ExitStatus) -> ExitCode {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map_or(ExitCode::FAILURE, ExitCode::from)
}
