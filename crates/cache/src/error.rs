//! Error types for the cache crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use artcache_remote::RemoteError;
use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Stage of a cache operation that talked to the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStage {
    /// Existence probe before a download
    Check,
    /// Fetching the archive
    Download,
    /// Sending the archive
    Upload,
}

impl std::fmt::Display for RemoteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Check => "Check cache",
            Self::Download => "Download",
            Self::Upload => "Upload",
        })
    }
}

/// Error type for cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Required options are missing or invalid
    #[error("Missing Artifactory options: \n\n{}", missing.join("\n"))]
    #[diagnostic(
        code(artcache::cache::missing_options),
        help("Set the options in the runner configuration or via environment variables")
    )]
    MissingOptions {
        /// One line per missing option, naming both the env var and the option key
        missing: Vec<String>,
    },

    /// Configuration or validation error
    #[error("Cache configuration error: {message}")]
    #[diagnostic(code(artcache::cache::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// The remote store failed or was unreachable
    #[error("Storage Cache: {stage} error - {source}")]
    #[diagnostic(code(artcache::cache::remote))]
    Remote {
        /// Which part of the protocol failed
        stage: RemoteStage,
        /// The underlying client error
        #[source]
        source: RemoteError,
    },

    /// Creating or extracting an archive failed
    #[error("Error {operation} tar.gz file {}: {source}", path.display())]
    #[diagnostic(code(artcache::cache::archive))]
    Archive {
        /// "creating" or "extracting"
        operation: &'static str,
        /// Archive path
        path: Box<Path>,
        /// The underlying I/O or format error
        #[source]
        source: std::io::Error,
    },

    /// I/O error during cache operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(artcache::cache::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "create")
        operation: String,
    },

    /// A background store task did not run to completion
    #[error("Background task failed: {message}")]
    #[diagnostic(code(artcache::cache::task))]
    Task {
        /// Description of the failure
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(artcache::cache::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Wrap a remote store error with the stage it happened in
    #[must_use]
    pub const fn remote(stage: RemoteStage, source: RemoteError) -> Self {
        Self::Remote { stage, source }
    }

    /// Create an archive error
    #[must_use]
    pub fn archive(operation: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Archive {
            operation,
            path: path.as_ref().into(),
            source,
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create a background task error
    #[must_use]
    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task {
            message: msg.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;
