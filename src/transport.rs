//! Retrieval of remote artifacts to local paths

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
#[cfg(test)]
use mockall::automock;
use reqwest::Url;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported location: {0}")]
    UnsupportedLocation(String),

    #[error("Unexpected content length: {received} received bytes vs. {expected} expected")]
    ContentLength { expected: u64, received: u64 },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Trait for retrieving a remote artifact into a local file
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Retrieves `location` into `destination`, replacing its content
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of bytes written
    /// * `Err(TransportError)` - If the retrieval fails or times out
    async fn retrieve(&self, location: &str, destination: &Path) -> Result<u64, TransportError>;
}

/// Transport over HTTP(S), with local copies for `file://` locations and plain paths
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a new HttpTransport whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("appdownload/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    async fn download(&self, url: Url, destination: &Path) -> Result<u64, TransportError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(url.into()));
        }

        if !status.is_success() {
            warn!("Server returned status {}: {}", status, url);
            return Err(TransportError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let expected = response.content_length();
        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| TransportError::io(destination, e))?;

        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| TransportError::io(destination, e))?;
            received += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| TransportError::io(destination, e))?;

        if let Some(expected) = expected
            && expected != received
        {
            return Err(TransportError::ContentLength { expected, received });
        }

        debug!("Retrieved {} bytes from {}", received, url);
        Ok(received)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }
}

/// What a location designates
#[derive(Debug, PartialEq)]
enum Source {
    Local(PathBuf),
    Remote(Url),
}

fn resolve(location: &str) -> Result<Source, TransportError> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map(Source::Local)
            .map_err(|_| TransportError::UnsupportedLocation(location.to_string())),
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Source::Remote(url)),
        // `C:\...` parses as a URL with a one-letter scheme
        Ok(url) if url.scheme().len() == 1 => Ok(Source::Local(PathBuf::from(location))),
        Ok(_) => Err(TransportError::UnsupportedLocation(location.to_string())),
        Err(_) => Ok(Source::Local(PathBuf::from(location))),
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn retrieve(&self, location: &str, destination: &Path) -> Result<u64, TransportError> {
        match resolve(location)? {
            Source::Local(source) => {
                if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
                    return Err(TransportError::NotFound(location.to_string()));
                }
                tokio::fs::copy(&source, destination)
                    .await
                    .map_err(|e| TransportError::io(&source, e))
            }
            Source::Remote(url) => self.download(url, destination).await,
        }
    }
}
