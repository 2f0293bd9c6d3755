use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::request::ContentLocator;

/// Failure to obtain chunk content. These are server-side errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Cannot retrieve file '{uri}' to process: {cause}")]
    Failed { uri: String, cause: String },

    #[error("Timed out after {timeout_ms}ms retrieving file '{uri}'")]
    TimedOut { uri: String, timeout_ms: u128 },
}

/// Resolves a [`ContentLocator`] into the chunk bytes.
///
/// URIs are fetched with a single GET bounded by `timeout`; inline uploads are
/// returned as-is. There are no retries.
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: Client,
    timeout: Duration,
}

impl ContentFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub async fn fetch(&self, locator: ContentLocator) -> Result<Bytes, FetchError> {
        match locator {
            ContentLocator::Inline(bytes) => Ok(bytes),
            ContentLocator::Uri(uri) => self.fetch_uri(&uri).await,
        }
    }

    async fn fetch_uri(&self, uri: &str) -> Result<Bytes, FetchError> {
        log::debug!("Fetching chunk from {uri}");

        let response = self
            .client
            .get(uri)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(uri, e))?;

        // A cache miss must not be decoded as if it were the chunk
        let response = response
            .error_for_status()
            .map_err(|e| self.classify(uri, e))?;

        let bytes = response.bytes().await.map_err(|e| self.classify(uri, e))?;
        log::debug!("Fetched {} bytes from {uri}", bytes.len());
        Ok(bytes)
    }

    fn classify(&self, uri: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::TimedOut {
                uri: uri.to_string(),
                timeout_ms: self.timeout.as_millis(),
            }
        } else {
            FetchError::Failed {
                uri: uri.to_string(),
                cause: format!("{:#}", anyhow::Error::new(err)),
            }
        }
    }
}
