//! Per-invocation wiring between an orchestrator run and the remote cache
//!
//! [`run_tasks`] decides once, before any task runs, whether the remote
//! cache takes part. A disabled or misconfigured remote never stops the
//! run; it only means results stay in the local cache.

use crate::diagnostics::Diagnostics;
use crate::engine::ArtifactCache;
use crate::options::{CacheSettings, DISABLE_VAR};
use crate::remote_cache::RemoteCache;
use futures::FutureExt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, warn};

/// Why a run went ahead without the remote cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalReason {
    /// [`DISABLE_VAR`] was `true`
    Disabled,
    /// The engine could not be built; carries the rendered error
    Misconfigured(String),
}

/// Which cache a run used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    /// Local and remote cache
    Remote,
    /// Local cache only
    Local {
        /// What kept the remote cache out
        reason: LocalReason,
    },
}

impl CacheMode {
    /// Whether the remote cache took part
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote)
    }
}

/// Result of [`run_tasks`]
#[derive(Debug)]
pub struct RunOutcome<T> {
    /// Whatever the orchestrator returned
    pub result: T,
    /// Which cache was used
    pub mode: CacheMode,
    /// First remote failure captured during the run
    pub failure: Option<String>,
}

/// Run `execute` with the remote cache when it is enabled and configured
///
/// `execute` receives `None` when the run is local-only. In remote mode all
/// uploads have settled and the first captured failure has been reported by
/// the time this returns, whatever `execute` produced. A panic in
/// `execute` is resumed only after the drain.
pub async fn run_tasks<F, Fut, T>(settings: &CacheSettings, execute: F) -> RunOutcome<T>
where
    F: FnOnce(Option<Arc<dyn RemoteCache>>) -> Fut,
    Fut: Future<Output = T>,
{
    let notes = !settings.skip_nx_cache;

    if settings.disabled {
        if notes {
            info!("USING LOCAL CACHE ({DISABLE_VAR} is set to true)");
        }
        return RunOutcome {
            result: execute(None).await,
            mode: CacheMode::Local {
                reason: LocalReason::Disabled,
            },
            failure: None,
        };
    }

    let diagnostics = Arc::new(Diagnostics::new());
    let engine = match ArtifactCache::new(settings, Arc::clone(&diagnostics)) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            let message = e.to_string();
            warn!(error = %message, "Remote cache is not configured");
            if notes {
                info!("USING LOCAL CACHE");
            }
            return RunOutcome {
                result: execute(None).await,
                mode: CacheMode::Local {
                    reason: LocalReason::Misconfigured(message),
                },
                failure: None,
            };
        }
    };

    if notes {
        info!("USING REMOTE CACHE");
    }

    let remote: Arc<dyn RemoteCache> = engine.clone();
    let result = AssertUnwindSafe(execute(Some(remote))).catch_unwind().await;

    engine.wait_for_store_requests_to_complete().await;
    let failure = diagnostics.report();

    let result = match result {
        Ok(result) => result,
        Err(payload) => {
            warn!("Task execution panicked after uploads settled");
            panic::resume_unwind(payload)
        }
    };

    RunOutcome {
        result,
        mode: CacheMode::Remote,
        failure,
    }
}
