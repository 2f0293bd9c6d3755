//! Inbound request validation.
//!
//! The HTTP layer collects the form fields of `POST /process` into a
//! [`RawRequest`]; [`validate`] turns that into a [`ProcessingRequest`] or a
//! [`RequestError`] naming the offending field. No I/O happens here.

use bytes::Bytes;
use serde_json::{Map, Value};
use std::num::ParseIntError;
use std::sync::OnceLock;
use thiserror::Error;

pub const START_OFFSET_FIELD: &str = "startOffsetMS";
pub const END_OFFSET_FIELD: &str = "endOffsetMS";
pub const MIME_TYPE_FIELD: &str = "chunkMimeType";
pub const CACHE_URI_FIELD: &str = "cacheURI";
pub const CHUNK_FIELD: &str = "chunk";
pub const PAYLOAD_FIELD: &str = "payload";
pub const HEARTBEAT_FIELD: &str = "heartbeatWebhook";

/// Validation failures. All of them are client errors (HTTP 400).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("field '{0}' could not be found in the request")]
    MissingField(&'static str),

    #[error("field {field} ('{value}') could not be converted to an integer: {cause}")]
    NotAnInteger {
        field: &'static str,
        value: String,
        cause: ParseIntError,
    },

    #[error("field {field} ('{value}') must not be negative")]
    NegativeOffset { field: &'static str, value: String },

    #[error("Chunk has media type '{0}'. Supported types are ['image/jpeg', 'image/tiff']")]
    UnsupportedMediaType(String),

    #[error(
        "Field cacheURI could not be read so there is nothing to process: field 'cacheURI' could not be found in the request"
    )]
    MissingContent,

    #[error("Request carries both a cacheURI and a chunk file part; send exactly one")]
    AmbiguousContent,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// Media types this engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Tiff,
}

impl MediaType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image/jpeg" => Some(Self::Jpeg),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
        }
    }
}

/// Where the chunk bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentLocator {
    /// Fetch the chunk from this URL.
    Uri(String),
    /// The chunk was uploaded as a multipart file part.
    Inline(Bytes),
}

impl ContentLocator {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Uri(uri) => uri.clone(),
            Self::Inline(bytes) => format!("inline chunk ({} bytes)", bytes.len()),
        }
    }
}

/// Options from the free-form `payload` field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// `None` when the payload says nothing about verbosity.
    pub verbose: Option<bool>,
    /// The whole parsed payload, kept for logging.
    pub payload: Map<String, Value>,
}

impl RequestOptions {
    /// Parse the JSON `payload` field. Malformed payloads are ignored.
    pub fn from_payload(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Self::default();
        };

        match serde_json::from_str::<Map<String, Value>>(text) {
            Ok(payload) => {
                let verbose = match payload.get("verbose") {
                    Some(Value::String(s)) => Some(s == "true"),
                    Some(Value::Bool(b)) => Some(*b),
                    _ => None,
                };
                Self { verbose, payload }
            }
            Err(e) => {
                log::warn!("Ignoring malformed payload: {e}");
                Self::default()
            }
        }
    }
}

/// A validated request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRequest {
    pub start_offset_ms: u64,
    pub stop_offset_ms: u64,
    pub media_type: MediaType,
    pub content: ContentLocator,
    pub callback_url: Option<String>,
    pub options: RequestOptions,
}

/// Headers, form fields and the optional uploaded chunk, as received.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    headers: Vec<(String, String)>,
    fields: Vec<(String, String)>,
    chunk: Option<Bytes>,
    options: OnceLock<RequestOptions>,
}

impl RawRequest {
    pub fn from_fields(fields: Vec<(String, String)>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.push_header(name.to_string(), value.to_string());
        self
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.push_field(name.to_string(), value.to_string());
        self
    }

    pub fn with_chunk(mut self, chunk: impl Into<Bytes>) -> Self {
        self.set_chunk(chunk.into());
        self
    }

    pub fn push_header(&mut self, name: String, value: String) {
        self.headers.push((name, value));
    }

    pub fn push_field(&mut self, name: String, value: String) {
        self.fields.push((name, value));
        self.options = OnceLock::new();
    }

    pub fn set_chunk(&mut self, chunk: Bytes) {
        self.chunk = Some(chunk);
    }

    /// First value of a field. An empty first value counts as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn chunk(&self) -> Option<&Bytes> {
        self.chunk.as_ref()
    }

    /// Options carried in the `payload` field, parsed on first use.
    pub fn options(&self) -> &RequestOptions {
        self.options
            .get_or_init(|| RequestOptions::from_payload(self.field(PAYLOAD_FIELD)))
    }
}

/// Validate a raw request.
///
/// Checks run in a fixed order (start offset, end offset, media type, content
/// locator) and the first failure is returned.
pub fn validate(raw: RawRequest) -> Result<ProcessingRequest, RequestError> {
    let start_offset_ms = offset(&raw, START_OFFSET_FIELD)?;
    let stop_offset_ms = offset(&raw, END_OFFSET_FIELD)?;

    let mime = raw
        .field(MIME_TYPE_FIELD)
        .ok_or(RequestError::MissingField(MIME_TYPE_FIELD))?;
    let media_type = MediaType::parse(mime)
        .ok_or_else(|| RequestError::UnsupportedMediaType(mime.to_string()))?;

    let options = raw.options().clone();
    let callback_url = raw.field(HEARTBEAT_FIELD).map(str::to_string);
    let uri = raw.field(CACHE_URI_FIELD).map(str::to_string);
    let content = match (uri, raw.chunk) {
        (Some(_), Some(_)) => return Err(RequestError::AmbiguousContent),
        (Some(uri), None) => ContentLocator::Uri(uri),
        (None, Some(chunk)) => ContentLocator::Inline(chunk),
        (None, None) => return Err(RequestError::MissingContent),
    };

    Ok(ProcessingRequest {
        start_offset_ms,
        stop_offset_ms,
        media_type,
        content,
        callback_url,
        options,
    })
}

fn offset(raw: &RawRequest, field: &'static str) -> Result<u64, RequestError> {
    let value = raw.field(field).ok_or(RequestError::MissingField(field))?;
    let parsed: i64 = value.parse().map_err(|cause| RequestError::NotAnInteger {
        field,
        value: value.to_string(),
        cause,
    })?;
    u64::try_from(parsed).map_err(|_| RequestError::NegativeOffset {
        field,
        value: value.to_string(),
    })
}
