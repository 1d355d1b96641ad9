//! CLI error types rendered through miette

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Remote cache operation failed: {message}")]
    #[diagnostic(
        code(artcache::cli::remote_failed),
        help("Run with --level debug to see every request")
    )]
    RemoteFailed { message: String },

    #[error("Failed to start `{program}`")]
    #[diagnostic(
        code(artcache::cli::spawn_failed),
        help("Check that the command exists and is executable")
    )]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File operation failed: {operation} {}", path.display())]
    #[diagnostic(
        code(artcache::cli::file_error),
        help("Check file permissions and ensure the path exists")
    )]
    FileError {
        operation: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn remote_failed(message: impl Into<String>) -> Self {
        Self::RemoteFailed {
            message: message.into(),
        }
    }

    pub fn spawn_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            source,
        }
    }

    pub fn file_error(
        operation: &'static str,
        path: impl Into<std::path::PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileError {
            operation,
            path: path.into(),
            source,
        }
    }
}
