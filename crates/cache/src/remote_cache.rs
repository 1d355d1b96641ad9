//! Interface between a task orchestrator and a remote cache

use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::warn;

/// A remote cache as seen by the task orchestrator
///
/// The orchestrator owns the local cache directory. It calls
/// [`RemoteCache::retrieve`] after a local miss, [`RemoteCache::store`] after
/// a task produced fresh output, and
/// [`RemoteCache::wait_for_store_requests_to_complete`] once, after the last
/// store. None of these report errors; failures degrade to `false`.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    /// Fetch the entry for `hash` into `cache_dir`
    ///
    /// Returns true only when `{cache_dir}/{hash}` is fully populated and the
    /// `{hash}.commit` marker has been written.
    async fn retrieve(&self, hash: &str, cache_dir: &Path) -> bool;

    /// Start uploading `{cache_dir}/{hash}`
    ///
    /// The upload is registered before this returns, so a later drain
    /// always waits for it. Dropping the handle does not cancel it.
    fn store(&self, hash: &str, cache_dir: &Path) -> StoreHandle;

    /// Wait until every store issued so far has settled
    async fn wait_for_store_requests_to_complete(&self);
}

/// Deferred outcome of [`RemoteCache::store`]
#[derive(Debug)]
#[must_use = "the upload runs regardless, but its outcome is only visible by awaiting the handle"]
pub struct StoreHandle {
    state: StoreState,
}

#[derive(Debug)]
enum StoreState {
    Ready(bool),
    Pending(JoinHandle<bool>),
}

impl StoreHandle {
    /// A handle that is already resolved
    pub const fn ready(stored: bool) -> Self {
        Self {
            state: StoreState::Ready(stored),
        }
    }

    /// A handle resolving with a spawned task
    pub const fn pending(handle: JoinHandle<bool>) -> Self {
        Self {
            state: StoreState::Pending(handle),
        }
    }

    /// Whether the outcome is already known
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match &self.state {
            StoreState::Ready(_) => true,
            StoreState::Pending(handle) => handle.is_finished(),
        }
    }
}

impl Future for StoreHandle {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        let this = self.get_mut();
        match &mut this.state {
            StoreState::Ready(stored) => Poll::Ready(*stored),
            StoreState::Pending(handle) => match Pin::new(handle).poll(cx) {
                Poll::Ready(joined) => {
                    let stored = joined.unwrap_or_else(|e| {
                        warn!(error = %e, "Store task did not complete");
                        false
                    });
                    this.state = StoreState::Ready(stored);
                    Poll::Ready(stored)
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_handle() {
        let handle = StoreHandle::ready(false);
        assert!(handle.is_ready());
        assert!(!handle.await);
    }

    #[tokio::test]
    async fn test_pending_handle_resolves_with_task() {
        let handle = StoreHandle::pending(tokio::spawn(async { true }));
        assert!(handle.await);
    }

    #[tokio::test]
    async fn test_panicked_task_resolves_false() {
        #[allow(clippy::panic)]
        let handle = StoreHandle::pending(tokio::spawn(async { panic!("boom") }));
        assert!(!handle.await);
    }
}
