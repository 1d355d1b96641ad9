use crate::tracing::{LogLevel, TracingFormat};
use artcache_cache::{CacheOptions, CacheSettings, EnvOverrides};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "artcache")]
#[command(about = "Remote build cache backed by an Artifactory repository")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "JSON file with cache options")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Artifactory base URL")]
    pub url: Option<String>,

    #[arg(long = "repo-key", global = true, help = "Repository key")]
    pub repo_key: Option<String>,

    #[arg(long = "cache-dir", global = true, help = "Local cache directory")]
    pub cache_dir: Option<PathBuf>,

    #[arg(short = 'l', long, global = true, help = "Set logging level", value_enum)]
    pub level: Option<LogLevel>,

    #[arg(
        long = "log-format",
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Validate the remote cache configuration")]
    Check,
    #[command(about = "Fetch a cache entry into the cache directory")]
    Retrieve {
        #[arg(help = "Task hash")]
        hash: String,
    },
    #[command(about = "Upload a cache entry from the cache directory")]
    Store {
        #[arg(help = "Task hash")]
        hash: String,
    },
    #[command(about = "Run a command unless its output is already cached")]
    Run {
        #[arg(long, help = "Task hash")]
        hash: String,
        #[arg(last = true, required = true, help = "Command to run")]
        command: Vec<String>,
    },
}

impl Cli {
    /// Resolve settings from the config file, the environment, then flags
    pub fn settings(&self) -> artcache_cache::Result<CacheSettings> {
        self.settings_with(&EnvOverrides::from_env())
    }

    pub fn settings_with(&self, env: &EnvOverrides) -> artcache_cache::Result<CacheSettings> {
        let options = match &self.config {
            Some(path) => CacheOptions::from_json_file(path)?,
            None => CacheOptions::default(),
        };

        let mut settings = CacheSettings::resolve(options, env);
        if let Some(url) = &self.url {
            settings.url = Some(url.clone());
        }
        if let Some(repo_key) = &self.repo_key {
            settings.repo_key = Some(repo_key.clone());
        }
        if let Some(dir) = &self.cache_dir {
            settings.cache_path = Some(dir.clone());
        }
        Ok(settings)
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
