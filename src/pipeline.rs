use bytes::Bytes;
use log::Level;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::envelope::ResponseEnvelope;
use crate::error::ProcessError;
use crate::exif::{self, MetadataResult};
use crate::fetch::ContentFetcher;
use crate::notify::{HttpStatusNotifier, NoopNotifier, StatusNotifier, StatusPayload};
use crate::request::{self, ProcessingRequest, RawRequest};

/// Runs one chunk through validate → fetch → decode → envelope.
///
/// Holds no per-request state and can be shared across handler tasks.
///
/// # Example
///
/// ```rust,no_run
/// use exif_extract::config::Config;
/// use exif_extract::pipeline::Engine;
/// use exif_extract::request::RawRequest;
///
/// # async fn example() -> anyhow::Result<()> {
/// let engine = Engine::from_config(&Config::default());
/// let raw = RawRequest::default()
///     .with_field("startOffsetMS", "1000")
///     .with_field("endOffsetMS", "2000")
///     .with_field("chunkMimeType", "image/jpeg")
///     .with_field("cacheURI", "http://cache.local/chunk.jpg");
///
/// let envelope = engine.process(raw).await?;
/// println!("{}", serde_json::to_string_pretty(&envelope)?);
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    fetcher: ContentFetcher,
    notifier: Arc<dyn StatusNotifier>,
    default_verbose: bool,
}

impl Engine {
    pub fn new(
        fetcher: ContentFetcher,
        notifier: Arc<dyn StatusNotifier>,
        default_verbose: bool,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            default_verbose,
        }
    }

    /// Build an engine with an HTTP fetcher and, if enabled, HTTP heartbeats.
    pub fn from_config(config: &Config) -> Self {
        let notifier: Arc<dyn StatusNotifier> = if config.notify.enabled {
            Arc::new(HttpStatusNotifier::new(config.notify_timeout()))
        } else {
            Arc::new(NoopNotifier)
        };
        Self::new(
            ContentFetcher::new(config.fetch_timeout()),
            notifier,
            config.logging.default_verbose,
        )
    }

    /// Process one request.
    ///
    /// Validation and fetch failures short-circuit with an error. A decode
    /// failure does not: it ends up in the envelope's `exifError`.
    pub async fn process(&self, raw: RawRequest) -> Result<ResponseEnvelope, ProcessError> {
        let options = raw.options();
        let level = if options.verbose.unwrap_or(self.default_verbose) {
            Level::Info
        } else {
            Level::Debug
        };
        log_request(&raw, level);
        if !options.payload.is_empty() {
            log::log!(level, "Task payload: {:?}", options.payload);
        }

        let request = request::validate(raw)?;
        let ProcessingRequest {
            start_offset_ms,
            stop_offset_ms,
            media_type,
            content,
            callback_url,
            ..
        } = request;

        log::info!(
            "Getting EXIF data for {} ({})",
            content.describe(),
            media_type.as_str()
        );
        let bytes = match self.fetcher.fetch(content).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("{e}");
                if let Some(url) = callback_url.as_deref() {
                    self.notifier
                        .notify(url, &StatusPayload::failed(&e.to_string()))
                        .await;
                }
                return Err(e.into());
            }
        };

        let started = Instant::now();
        let result = decode(bytes).await;
        let duration = started.elapsed();

        match &result {
            Ok(tags) => log::info!("Decoded {} tag(s) in {duration:?}", tags.len()),
            Err(reason) => log::info!("No EXIF data extracted in {duration:?}: {reason}"),
        }

        if let Some(url) = callback_url.as_deref() {
            self.notifier
                .notify(url, &StatusPayload::decoded(&result, duration))
                .await;
        }

        Ok(ResponseEnvelope::from_result(
            result,
            start_offset_ms,
            stop_offset_ms,
        ))
    }
}

/// Decode off the async workers; tag parsing is CPU-bound.
async fn decode(bytes: Bytes) -> MetadataResult {
    match tokio::task::spawn_blocking(move || exif::decode_exif(&bytes)).await {
        Ok(result) => result,
        Err(e) => Err(format!("exif: decoder task failed: {e}")),
    }
}

/// Dump the received headers and form fields. File parts are summarized by
/// size.
fn log_request(raw: &RawRequest, level: Level) {
    if !log::log_enabled!(level) {
        return;
    }
    log::log!(level, "  Header fields:");
    for (key, value) in raw.headers() {
        log::log!(level, "    {key} -> {value}");
    }
    log::log!(level, "  Form fields:");
    for (key, value) in raw.fields() {
        log::log!(level, "    {key} -> {value}");
    }
    if let Some(chunk) = raw.chunk() {
        log::log!(level, "    {} -> <{} bytes>", request::CHUNK_FIELD, chunk.len());
    }
}
