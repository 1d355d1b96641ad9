//! Tracing setup for the artcache CLI
//!
//! Logs always go to stderr so that stdout stays free for command results
//! and for the output of commands run through `artcache run`.

use std::io;
pub use tracing::Level;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

/// Tracing output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format
    Json,
    /// Development format with extra context
    Dev,
}

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above
    Info,
    /// Show warnings and above
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: TracingFormat,
    pub level: Level,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Compact,
            // Runner notes are info level and should be visible by default
            level: Level::INFO,
        }
    }
}

impl TracingConfig {
    /// Pick the level from an explicit flag, then the verbose toggle
    #[must_use]
    pub fn with_level(mut self, explicit: Option<LogLevel>, verbose: bool) -> Self {
        self.level = match (explicit, verbose) {
            (Some(level), _) => level.into(),
            (None, true) => Level::DEBUG,
            (None, false) => Level::INFO,
        };
        self
    }
}

/// Global correlation ID for tracing request correlation
static CORRELATION_ID: std::sync::OnceLock<Uuid> = std::sync::OnceLock::new();

/// Get or create a correlation ID for the current session
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

fn level_directive(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    ["artcache", "artcache_cli", "artcache_cache", "artcache_remote"]
        .map(|target| format!("{target}={level}"))
        .join(",")
}

/// Build the stderr formatting layer for `config`
fn fmt_layer<S>(config: &TracingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    match config.format {
        TracingFormat::Pretty => base
            .pretty()
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
        TracingFormat::Compact => base.compact().with_target(false).boxed(),
        TracingFormat::Json => base
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        TracingFormat::Dev => base
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
    }
}

/// Initialize tracing with the given configuration
///
/// `RUST_LOG` takes precedence over the configured level when it is set.
pub fn init_tracing(config: TracingConfig) -> miette::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_directive(config.level)))
        .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))?;

    tracing_subscriber::registry()
        .with(fmt_layer(&config).with_filter(env_filter))
        .try_init()
        .map_err(|e| miette::miette!("Failed to install tracing subscriber: {e}"))?;

    tracing::debug!(
        correlation_id = %correlation_id(),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized for artcache CLI"
    );

    Ok(())
}
