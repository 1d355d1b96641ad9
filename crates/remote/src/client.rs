//! HTTP client for the artifact store
//!
//! Every operation streams: uploads read the local file in chunks and
//! downloads write the response body chunk by chunk into a `.part` file that
//! is renamed into place only when the body has been fully received.

use crate::config::{RemoteConfig, RetryConfig};
use crate::error::{RemoteError, Result};
use crate::retry::retry_with_backoff;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, trace};

/// Client for an Artifactory-compatible artifact repository
#[derive(Clone)]
pub struct ArtifactoryClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    retry: RetryConfig,
}

impl fmt::Debug for ArtifactoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactoryClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ArtifactoryClient {
    /// Create a client from connection settings
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| RemoteError::invalid_url(&config.base_url, e.to_string()))?;

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(RemoteError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            retry: config.retry.clone(),
        })
    }

    /// Base URL with any trailing slash removed
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an object path against the base URL
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| RemoteError::invalid_url(joined, e.to_string()))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check whether an object exists
    ///
    /// Returns `Ok(false)` only when the server answers 404. Any other
    /// non-success status, and any transport failure, is an error: an
    /// unreachable store is not the same thing as an absent object.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let url = self.url_for(path)?;
        retry_with_backoff(&self.retry, "exists", || self.exists_once(&url)).await
    }

    async fn exists_once(&self, url: &Url) -> Result<bool> {
        trace!(%url, "HEAD");
        let response = self
            .authorize(self.http.head(url.clone()))
            .send()
            .await
            .map_err(|e| RemoteError::transport("HEAD", url.as_str(), e))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RemoteError::status("HEAD", url.as_str(), status.as_u16())),
        }
    }

    /// Upload a local file to `remote_path`, streaming its contents
    pub async fn upload(&self, local_file: &Path, remote_path: &str) -> Result<()> {
        let url = self.url_for(remote_path)?;
        retry_with_backoff(&self.retry, "upload", || self.upload_once(local_file, &url)).await
    }

    async fn upload_once(&self, local_file: &Path, url: &Url) -> Result<()> {
        let file = tokio::fs::File::open(local_file)
            .await
            .map_err(|e| RemoteError::io(e, local_file, "open"))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| RemoteError::io(e, local_file, "stat"))?
            .len();

        debug!(%url, size, "Uploading artifact");
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .authorize(self.http.put(url.clone()))
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .map_err(|e| RemoteError::transport("PUT", url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::status("PUT", url.as_str(), status.as_u16()));
        }
        Ok(())
    }

    /// Download `remote_path` into `local_file`
    ///
    /// The body is streamed to a sibling `.part` file which replaces
    /// `local_file` only after the last chunk was written. On failure the
    /// partial file is removed and `local_file` is left untouched.
    pub async fn download(&self, remote_path: &str, local_file: &Path) -> Result<()> {
        let url = self.url_for(remote_path)?;
        retry_with_backoff(&self.retry, "download", || self.download_once(&url, local_file)).await
    }

    async fn download_once(&self, url: &Url, local_file: &Path) -> Result<()> {
        debug!(%url, "Downloading artifact");
        let response = self
            .authorize(self.http.get(url.clone()))
            .query(&[("skipUpdateStats", "true")])
            .send()
            .await
            .map_err(|e| RemoteError::transport("GET", url.as_str(), e))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(RemoteError::not_found(url.as_str())),
            status => return Err(RemoteError::status("GET", url.as_str(), status.as_u16())),
        }

        let partial = partial_path(local_file);
        if let Err(e) = write_body(response, url, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        tokio::fs::rename(&partial, local_file)
            .await
            .map_err(|e| RemoteError::io(e, local_file, "rename"))
    }
}

async fn write_body(mut response: reqwest::Response, url: &Url, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| RemoteError::io(e, path, "create"))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| RemoteError::transport("GET", url.as_str(), e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| RemoteError::io(e, path, "write"))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| RemoteError::io(e, path, "flush"))?;
    file.sync_all()
        .await
        .map_err(|e| RemoteError::io(e, path, "sync"))?;

    trace!(%url, bytes = written, "Download complete");
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}
