//! Runner options and their environment overrides
//!
//! Options come from two places: an explicit [`CacheOptions`] object (usually
//! the runner section of a project configuration file) and a handful of
//! environment variables. Both are merged exactly once, at invocation entry,
//! into an immutable [`CacheSettings`] value that is then passed down
//! explicitly. Nothing below this module reads the process environment.

use crate::{Error, Result};
use artcache_remote::{RemoteConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Base URL of the artifact store
pub const URL_VAR: &str = "NXCACHE_ARTIFACTORY_URL";
/// Repository key the cache entries live under
pub const REPO_KEY_VAR: &str = "NXCACHE_ARTIFACTORY_REPO_KEY";
/// Bearer token, takes precedence over every configured token
pub const AUTH_VAR: &str = "NXCACHE_ARTIFACTORY_BASIC_HTTP_AUTH";
/// Fallback bearer token when nothing else is configured
pub const ACCESS_TOKEN_VAR: &str = "ARTIFACTORY_ACCESS_TOKEN";
/// Any non-empty value turns on debug logging
pub const VERBOSE_VAR: &str = "NXCACHE_VERBOSE_LOGGING";
/// `true` skips the remote cache entirely
pub const DISABLE_VAR: &str = "NXCACHE_ARTIFACTORY_DISABLE";
/// `true` silences the runner notes
pub const SKIP_NX_CACHE_VAR: &str = "NXCACHE_SKIP_NX_CACHE";

/// Cache directory used when none is configured
pub const DEFAULT_CACHE_DIR: &str = ".nx/cache";

/// Explicit runner options, as written in a configuration file
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheOptions {
    /// Base URL of the artifact store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Bearer token; preferred over `auth_token` when both are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_http_auth: Option<String>,

    /// Repository key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_key: Option<String>,

    /// Local cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    /// Silence the runner notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_nx_cache: Option<bool>,

    /// Retry policy for remote requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("url", &self.url)
            .field("auth_token", &redact(self.auth_token.as_ref()))
            .field("basic_http_auth", &redact(self.basic_http_auth.as_ref()))
            .field("repo_key", &self.repo_key)
            .field("cache_path", &self.cache_path)
            .field("skip_nx_cache", &self.skip_nx_cache)
            .field("retry", &self.retry)
            .finish()
    }
}

impl CacheOptions {
    /// Parse options from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::serialization(format!("Failed to parse cache options: {e}")))
    }

    /// Load options from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        Self::from_json_str(&content)
    }
}

/// Environment variable overrides, captured once
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// [`URL_VAR`]
    pub url: Option<String>,
    /// [`REPO_KEY_VAR`]
    pub repo_key: Option<String>,
    /// [`AUTH_VAR`]
    pub auth_token: Option<String>,
    /// [`ACCESS_TOKEN_VAR`]
    pub access_token: Option<String>,
    /// [`VERBOSE_VAR`] is set
    pub verbose: bool,
    /// [`DISABLE_VAR`] is `true`
    pub disabled: bool,
    /// [`SKIP_NX_CACHE_VAR`], if set
    pub skip_nx_cache: Option<bool>,
}

impl fmt::Debug for EnvOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvOverrides")
            .field("url", &self.url)
            .field("repo_key", &self.repo_key)
            .field("auth_token", &redact(self.auth_token.as_ref()))
            .field("access_token", &redact(self.access_token.as_ref()))
            .field("verbose", &self.verbose)
            .field("disabled", &self.disabled)
            .field("skip_nx_cache", &self.skip_nx_cache)
            .finish()
    }
}

impl EnvOverrides {
    /// Read the overrides from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the overrides through an arbitrary lookup function
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            url: get(URL_VAR),
            repo_key: get(REPO_KEY_VAR),
            auth_token: get(AUTH_VAR),
            access_token: get(ACCESS_TOKEN_VAR),
            verbose: get(VERBOSE_VAR).is_some(),
            disabled: get(DISABLE_VAR).is_some_and(|v| v == "true"),
            skip_nx_cache: get(SKIP_NX_CACHE_VAR).map(|v| v == "true"),
        }
    }
}

/// Fully resolved, immutable configuration for one invocation
#[derive(Clone, PartialEq)]
pub struct CacheSettings {
    /// Base URL of the artifact store
    pub url: Option<String>,
    /// Repository key
    pub repo_key: Option<String>,
    /// Bearer token
    pub token: Option<String>,
    /// Local cache directory
    pub cache_path: Option<PathBuf>,
    /// Silence the runner notes
    pub skip_nx_cache: bool,
    /// Skip the remote cache entirely
    pub disabled: bool,
    /// Debug logging requested
    pub verbose: bool,
    /// Retry policy for remote requests
    pub retry: RetryConfig,
}

impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("url", &self.url)
            .field("repo_key", &self.repo_key)
            .field("token", &redact(self.token.as_ref()))
            .field("cache_path", &self.cache_path)
            .field("skip_nx_cache", &self.skip_nx_cache)
            .field("disabled", &self.disabled)
            .field("verbose", &self.verbose)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Where and how to reach the remote store, after validation
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTarget {
    /// Connection settings for the client
    pub remote: RemoteConfig,
    /// Repository key, without surrounding slashes
    pub repo_key: String,
}

impl CacheSettings {
    /// Merge explicit options with environment overrides
    ///
    /// Environment values win. The token is taken from, in order:
    /// [`AUTH_VAR`], `basicHttpAuth`, `authToken`, [`ACCESS_TOKEN_VAR`].
    #[must_use]
    pub fn resolve(options: CacheOptions, env: &EnvOverrides) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let token = env
            .auth_token
            .clone()
            .or_else(|| non_empty(options.basic_http_auth))
            .or_else(|| non_empty(options.auth_token))
            .or_else(|| env.access_token.clone());

        Self {
            url: env.url.clone().or_else(|| non_empty(options.url)),
            repo_key: env.repo_key.clone().or_else(|| non_empty(options.repo_key)),
            token,
            cache_path: options.cache_path,
            skip_nx_cache: env
                .skip_nx_cache
                .or(options.skip_nx_cache)
                .unwrap_or(false),
            disabled: env.disabled,
            verbose: env.verbose,
            retry: options.retry.unwrap_or_default(),
        }
    }

    /// Merge explicit options with the process environment
    #[must_use]
    pub fn from_env(options: CacheOptions) -> Self {
        Self::resolve(options, &EnvOverrides::from_env())
    }

    /// Validate that every required option is present
    ///
    /// The error lists all missing options at once.
    pub fn check_config(&self) -> Result<RemoteTarget> {
        let url = self.url.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let repo_key = self
            .repo_key
            .as_deref()
            .map(|k| k.trim().trim_matches('/'))
            .filter(|s| !s.is_empty());

        let mut missing = Vec::new();
        if url.is_none() {
            missing.push(format!("{URL_VAR} | url"));
        }
        if repo_key.is_none() {
            missing.push(format!("{REPO_KEY_VAR} | repoKey"));
        }

        match (url, repo_key) {
            (Some(url), Some(repo_key)) => Ok(RemoteTarget {
                remote: RemoteConfig::new(url)
                    .with_token(self.token.clone())
                    .with_retry(self.retry.clone()),
                repo_key: repo_key.to_string(),
            }),
            _ => Err(Error::MissingOptions { missing }),
        }
    }

    /// Local cache directory, falling back to [`DEFAULT_CACHE_DIR`]
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "<redacted>")
}
