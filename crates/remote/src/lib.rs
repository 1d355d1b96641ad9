//! Artifact store client for artcache
//!
//! This crate is a thin HTTP façade over an Artifactory-compatible artifact
//! repository. It knows how to probe, upload and download single objects
//! addressed by a path relative to the configured base URL, and nothing
//! about caching.
//!
//! - `HEAD {base}/{path}` answers whether an object exists
//! - `PUT {base}/{path}` streams a local file up
//! - `GET {base}/{path}` streams an object down to a local file
//!
//! All requests carry an `Authorization: Bearer <token>` header when a token
//! is configured.

pub mod client;
pub mod config;
pub mod error;
pub mod retry;

pub use client::ArtifactoryClient;
pub use config::{RemoteConfig, RetryConfig};
pub use error::{RemoteError, Result};
