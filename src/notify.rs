//! Heartbeat callbacks to the orchestrator.
//!
//! A synchronous engine reports at most one final status per task. The
//! callback is best-effort: delivery failures are logged and never change the
//! response already computed for the caller.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::exif::MetadataResult;

/// Final task status. Only `complete` and `failed` make sense for an engine
/// that answers synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Complete,
    Failed,
}

/// Body of a heartbeat callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub status: TaskStatus,
    pub info_msg: BTreeMap<String, String>,
}

impl StatusPayload {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            info_msg: BTreeMap::new(),
        }
    }

    pub fn with_info(mut self, key: &str, value: impl Into<String>) -> Self {
        self.info_msg.insert(key.to_string(), value.into());
        self
    }

    /// Report a finished decode.
    ///
    /// The task is `complete` even when no tags were found, since the caller
    /// still receives a 200 with the reason inside the envelope.
    pub fn decoded(result: &MetadataResult, duration: Duration) -> Self {
        let payload = Self::new(TaskStatus::Complete)
            .with_info("processingDuration", format!("{duration:?}"));
        match result {
            Ok(tags) => payload.with_info("tagCount", tags.len().to_string()),
            Err(reason) => payload.with_info("exifError", reason.as_str()),
        }
    }

    /// Report a request that failed before anything could be decoded.
    pub fn failed(reason: &str) -> Self {
        Self::new(TaskStatus::Failed).with_info("error", reason)
    }
}

/// Sends task status to a callback URL.
///
/// Implementations swallow their own failures; there is nothing for the caller
/// to handle.
#[async_trait::async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, url: &str, payload: &StatusPayload);
}

/// Posts the payload as JSON and discards whatever comes back.
pub struct HttpStatusNotifier {
    client: Client,
    timeout: Duration,
}

impl HttpStatusNotifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl StatusNotifier for HttpStatusNotifier {
    async fn notify(&self, url: &str, payload: &StatusPayload) {
        let response = match self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Unable to send heartbeat to {url}: {e}");
                return;
            }
        };

        let status = response.status();
        // Drain the body so the connection can be reused
        if let Err(e) = response.bytes().await {
            log::debug!("Failed to read heartbeat response from {url}: {e}");
        }

        if status.is_success() {
            log::debug!("Heartbeat delivered to {url} ({status})");
        } else {
            log::warn!("Heartbeat to {url} was rejected: {status}");
        }
    }
}

/// Drops every notification.
pub struct NoopNotifier;

#[async_trait::async_trait]
impl StatusNotifier for NoopNotifier {
    async fn notify(&self, url: &str, _payload: &StatusPayload) {
        log::debug!("Heartbeat to {url} skipped: notifications disabled");
    }
}
