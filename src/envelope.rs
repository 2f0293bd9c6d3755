//! The JSON response returned for a processed chunk.
//!
//! The wire schema uses `series` as the top-level array key:
//!
//! ```json
//! {
//!   "series": [{
//!     "startTimeMs": 1000,
//!     "stopTimeMs": 2000,
//!     "vendor": { "exif": { "DateTime": "2008:07:31 10:38:11" } }
//!   }]
//! }
//! ```
//!
//! When decoding failed, `vendor` holds `{"exifError": "..."}` instead.
//! [`Vendor`] is an enum, so a segment always carries exactly one of the two.

use serde::{Deserialize, Serialize};

use crate::exif::{MetadataResult, TagMap};

/// Top-level response body of `POST /process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub series: Vec<Segment>,
}

/// One timed slice of output. This engine always emits exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start_time_ms: u64,
    pub stop_time_ms: u64,
    pub vendor: Vendor,
}

/// Engine-specific payload of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Vendor {
    /// Decoded tags, keyed by EXIF tag name.
    #[serde(rename = "exif")]
    Exif(TagMap),
    /// Why no tags could be decoded.
    #[serde(rename = "exifError")]
    ExifError(String),
}

impl From<MetadataResult> for Vendor {
    fn from(result: MetadataResult) -> Self {
        match result {
            Ok(tags) => Vendor::Exif(tags),
            Err(reason) => Vendor::ExifError(reason),
        }
    }
}

impl Vendor {
    pub fn tags(&self) -> Option<&TagMap> {
        match self {
            Vendor::Exif(tags) => Some(tags),
            Vendor::ExifError(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Vendor::Exif(_) => None,
            Vendor::ExifError(reason) => Some(reason),
        }
    }
}

impl ResponseEnvelope {
    /// Wrap a decode outcome in a single segment spanning the caller's offsets.
    ///
    /// The offsets are copied through unchanged.
    pub fn from_result(result: MetadataResult, start_time_ms: u64, stop_time_ms: u64) -> Self {
        Self {
            series: vec![Segment {
                start_time_ms,
                stop_time_ms,
                vendor: Vendor::from(result),
            }],
        }
    }
}
