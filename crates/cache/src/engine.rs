//! Artifactory-backed remote cache engine

use crate::archive::{self, exclude_control_files};
use crate::diagnostics::Diagnostics;
use crate::error::RemoteStage;
use crate::options::CacheSettings;
use crate::remote_cache::{RemoteCache, StoreHandle};
use crate::{Error, Result};
use artcache_remote::ArtifactoryClient;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Outcome of a successful retrieve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retrieval {
    /// The entry was downloaded, extracted and committed
    Hit,
    /// The remote store confirmed the entry does not exist
    Miss,
}

/// Remote cache keeping entries at `{repo_key}/{hash}.tar.gz`
///
/// One instance serves one orchestrator invocation. Uploads run as tracked
/// background tasks; [`RemoteCache::wait_for_store_requests_to_complete`]
/// waits for all of them.
#[derive(Debug)]
pub struct ArtifactCache {
    shared: Arc<Shared>,
    uploads: TaskTracker,
}

#[derive(Debug)]
struct Shared {
    client: ArtifactoryClient,
    repo_key: String,
    diagnostics: Arc<Diagnostics>,
}

impl ArtifactCache {
    /// Validate `settings` and build an engine reporting into `diagnostics`
    pub fn new(settings: &CacheSettings, diagnostics: Arc<Diagnostics>) -> Result<Self> {
        let target = settings.check_config()?;
        let client = ArtifactoryClient::new(&target.remote)
            .map_err(|e| Error::configuration(e.to_string()))?;

        Ok(Self {
            shared: Arc::new(Shared {
                client,
                repo_key: target.repo_key,
                diagnostics,
            }),
            uploads: TaskTracker::new(),
        })
    }

    /// Diagnostics sink this engine reports into
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.shared.diagnostics
    }

    /// Number of stores that have not settled yet
    #[must_use]
    pub fn pending_uploads(&self) -> usize {
        self.uploads.len()
    }

    /// Retrieve without touching the diagnostics sink
    pub async fn try_retrieve(&self, hash: &str, cache_dir: &Path) -> Result<Retrieval> {
        self.shared.retrieve_entry(hash, cache_dir).await
    }

    /// Pack and upload without touching the diagnostics sink
    pub async fn try_store(&self, hash: &str, cache_dir: &Path) -> Result<()> {
        self.shared.store_entry(hash, cache_dir).await
    }
}

#[async_trait]
impl RemoteCache for ArtifactCache {
    async fn retrieve(&self, hash: &str, cache_dir: &Path) -> bool {
        match self.try_retrieve(hash, cache_dir).await {
            Ok(Retrieval::Hit) => true,
            Ok(Retrieval::Miss) => false,
            Err(e) => {
                debug!(%hash, error = %e, "Storage Cache: Cache error");
                self.shared.diagnostics.record(e);
                false
            }
        }
    }

    fn store(&self, hash: &str, cache_dir: &Path) -> StoreHandle {
        if let Some(previous) = self.shared.diagnostics.error() {
            debug!(%hash, error = %previous, "Storage Cache: Store skipped after earlier error");
            return StoreHandle::ready(false);
        }

        let shared = Arc::clone(&self.shared);
        let hash = hash.to_string();
        let cache_dir = cache_dir.to_path_buf();

        StoreHandle::pending(self.uploads.spawn(async move {
            let outcome = AssertUnwindSafe(shared.store_entry(&hash, &cache_dir))
                .catch_unwind()
                .await;
            settle_store(&shared.diagnostics, &hash, outcome)
        }))
    }

    async fn wait_for_store_requests_to_complete(&self) {
        debug!(pending = self.uploads.len(), "Waiting for uploads to finish");
        self.uploads.close();
        self.uploads.wait().await;
    }
}

impl Shared {
    fn remote_path(&self, hash: &str) -> String {
        format!("{}/{}", self.repo_key, archive_name(hash))
    }

    async fn retrieve_entry(&self, hash: &str, cache_dir: &Path) -> Result<Retrieval> {
        let remote_path = self.remote_path(hash);
        debug!(%hash, "Storage Cache: Downloading");

        let exists = self
            .client
            .exists(&remote_path)
            .await
            .map_err(|e| Error::remote(RemoteStage::Check, e))?;
        if !exists {
            debug!(%hash, "Storage Cache: Cache miss");
            return Ok(Retrieval::Miss);
        }

        tokio::fs::create_dir_all(cache_dir)
            .await
            .map_err(|e| Error::io(e, cache_dir, "create_dir_all"))?;

        let archive_path = archive_path(hash, cache_dir);
        self.client
            .download(&remote_path, &archive_path)
            .await
            .map_err(|e| Error::remote(RemoteStage::Download, e))?;
        debug!(%hash, "Storage Cache: Downloaded");

        let extracted = {
            let archive_path = archive_path.clone();
            let cache_dir = cache_dir.to_path_buf();
            run_blocking(move || archive::unpack(&archive_path, &cache_dir, exclude_control_files))
                .await
        };
        remove_quietly(&archive_path).await;
        if let Err(e) = extracted {
            // A half-extracted entry must not be mistaken for a usable one
            let _ = tokio::fs::remove_dir_all(cache_dir.join(hash)).await;
            return Err(e);
        }

        let commit = cache_dir.join(commit_name(hash));
        tokio::fs::write(&commit, "true")
            .await
            .map_err(|e| Error::io(e, &commit, "write"))?;

        debug!(%hash, "Storage Cache: Cache hit");
        Ok(Retrieval::Hit)
    }

    async fn store_entry(&self, hash: &str, cache_dir: &Path) -> Result<()> {
        let archive_path = archive_path(hash, cache_dir);

        let packed = {
            let archive_path = archive_path.clone();
            let cache_dir = cache_dir.to_path_buf();
            let hash = hash.to_string();
            run_blocking(move || {
                archive::pack(&cache_dir, &hash, &archive_path, exclude_control_files)
            })
            .await
        };
        if let Err(e) = packed {
            remove_quietly(&archive_path).await;
            return Err(e);
        }

        let remote_path = self.remote_path(hash);
        debug!(
            %hash,
            archive = %archive_path.display(),
            target = %remote_path,
            "Storage Cache: Uploading"
        );
        let uploaded = self
            .client
            .upload(&archive_path, &remote_path)
            .await
            .map_err(|e| Error::remote(RemoteStage::Upload, e));
        remove_quietly(&archive_path).await;
        uploaded?;

        debug!(%hash, "Storage Cache: Stored");
        Ok(())
    }
}

type StoreOutcome = std::result::Result<Result<()>, Box<dyn Any + Send>>;

/// Turn a finished upload into the handle's value, recording any failure
fn settle_store(diagnostics: &Diagnostics, hash: &str, outcome: StoreOutcome) -> bool {
    let err = match outcome {
        Ok(Ok(())) => return true,
        Ok(Err(e)) => e,
        Err(payload) => Error::task(format!(
            "store task for {hash} panicked: {}",
            panic_message(payload.as_ref())
        )),
    };
    debug!(%hash, error = %err, "Storage Cache: Store error");
    diagnostics.record(err);
    false
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

async fn run_blocking<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<usize> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::task(format!("archive task failed: {e}")))?
        .map(|_| ())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "Could not remove temporary archive");
    }
}

/// `{hash}.tar.gz`
#[must_use]
pub fn archive_name(hash: &str) -> String {
    format!("{hash}.tar.gz")
}

/// `{hash}.commit`
#[must_use]
pub fn commit_name(hash: &str) -> String {
    format!("{hash}.commit")
}

fn archive_path(hash: &str, cache_dir: &Path) -> PathBuf {
    cache_dir.join(archive_name(hash))
}
