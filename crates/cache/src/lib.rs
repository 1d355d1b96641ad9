//! Remote build-artifact cache for task orchestrators
//!
//! A task orchestrator keeps finished task outputs in a local cache
//! directory, one entry per task hash. This crate mirrors those entries to an
//! Artifactory repository so that other machines can reuse them:
//!
//! - [`RemoteCache`] is the contract the orchestrator talks to
//! - [`ArtifactCache`] implements it over [`artcache_remote::ArtifactoryClient`]
//! - [`CacheSettings`] is the configuration, resolved once per invocation
//! - [`run_tasks`] picks remote or local-only mode and drains uploads
//!
//! # Entry layout
//!
//! ```text
//! {cache_dir}/{hash}/...        entry directory (owned by the orchestrator)
//! {cache_dir}/{hash}/source     integrity marker, never transferred
//! {cache_dir}/{hash}.commit     written last on a successful retrieve
//! {repo_key}/{hash}.tar.gz      remote object
//! ```
//!
//! Remote failures never fail a task. They are kept in [`Diagnostics`] and
//! reported once the run is over.

mod error;
pub mod archive;
pub mod diagnostics;
pub mod engine;
pub mod options;
pub mod remote_cache;
pub mod runner;

pub use error::{Error, RemoteStage, Result};

pub use diagnostics::Diagnostics;
pub use engine::{ArtifactCache, Retrieval};
pub use options::{CacheOptions, CacheSettings, EnvOverrides, RemoteTarget};
pub use remote_cache::{RemoteCache, StoreHandle};
pub use runner::{CacheMode, LocalReason, RunOutcome, run_tasks};
