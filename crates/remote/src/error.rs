//! Error types for artifact store operations

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for artifact store operations
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors returned by [`crate::ArtifactoryClient`]
#[derive(Error, Debug, Diagnostic)]
pub enum RemoteError {
    /// The server confirmed that the object does not exist
    #[error("Artifact not found: {url}")]
    #[diagnostic(code(artcache_remote::not_found))]
    NotFound {
        /// Requested URL
        url: String,
    },

    /// The server answered with a non-success status
    #[error("{method} {url} failed with HTTP {status}")]
    #[diagnostic(
        code(artcache_remote::status),
        help("Check the repository key and that the token has read/deploy permissions")
    )]
    Status {
        /// HTTP method of the failed request
        method: &'static str,
        /// Requested URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// The request never produced a response, or the body stream broke
    #[error("{method} {url} failed: {source}")]
    #[diagnostic(code(artcache_remote::transport))]
    Transport {
        /// HTTP method of the failed request
        method: &'static str,
        /// Requested URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Reading or writing the local side of a transfer failed
    #[error("I/O {operation} failed: {}", path.display())]
    #[diagnostic(
        code(artcache_remote::io),
        help("Check file permissions and available disk space")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Local path involved in the transfer
        path: PathBuf,
        /// Operation that failed (e.g., "open", "write", "rename")
        operation: &'static str,
    },

    /// The base URL or an object path did not form a valid URL
    #[error("Invalid artifact store URL '{url}': {message}")]
    #[diagnostic(code(artcache_remote::invalid_url))]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        message: String,
    },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    #[diagnostic(code(artcache_remote::client_build))]
    ClientBuild(#[source] reqwest::Error),

    /// Retries were attempted and all of them failed
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    #[diagnostic(code(artcache_remote::retry_exhausted))]
    RetryExhausted {
        /// Operation name
        operation: String,
        /// Number of attempts made
        attempts: usize,
        /// Message of the last error
        last_error: String,
    },
}

impl RemoteError {
    /// Create a not-found error
    #[must_use]
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    /// Create a status error
    #[must_use]
    pub fn status(method: &'static str, url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            method,
            url: url.into(),
            status,
        }
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(method: &'static str, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            method,
            url: url.into(),
            source,
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(source: std::io::Error, path: impl AsRef<Path>, operation: &'static str) -> Self {
        Self::Io {
            source,
            path: path.as_ref().to_path_buf(),
            operation,
        }
    }

    /// Create an invalid URL error
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a retry exhausted error
    #[must_use]
    pub fn retry_exhausted(
        operation: impl Into<String>,
        attempts: usize,
        last_error: impl Into<String>,
    ) -> Self {
        Self::RetryExhausted {
            operation: operation.into(),
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Whether the server confirmed the object is absent
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status code carried by the error, if any
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
