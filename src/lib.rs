//! # exif-extract
//!
//! Metadata-extraction engine for still-image chunks. An orchestrator posts a
//! JPEG or TIFF chunk (inline, or as a URL to fetch) and gets back every EXIF
//! tag the decoder found, wrapped in a time-series envelope.
//!
//! ## Quick Start
//!
//! Run the HTTP service with the configured listener:
//!
//! ```rust,no_run
//! use exif_extract::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     exif_extract::server::serve(&config).await
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! Decode a file directly and build the response envelope yourself:
//!
//! ```rust,no_run
//! use exif_extract::envelope::ResponseEnvelope;
//! use exif_extract::exif::read_exif;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let result = read_exif(Path::new("photo.jpg"))?;
//!     let envelope = ResponseEnvelope::from_result(result, 0, 0);
//!     println!("{}", serde_json::to_string_pretty(&envelope)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Endpoints
//!
//! | Route | Result |
//! |-------|--------|
//! | `GET /ready` | 503 while warming up, 200 once ready, 500 if initialization failed |
//! | `POST /process` | 200 + JSON envelope, 400 bad request, 413 body too large, 500 fetch failed, 504 fetch timed out |
//!
//! ## Modules
//!
//! - [`config`]: Configuration types and loading/saving
//! - [`envelope`]: Response envelope returned by `/process`
//! - [`error`]: Request-level errors and their HTTP status codes
//! - [`exif`]: EXIF decoding into a JSON tag map
//! - [`fetch`]: Chunk retrieval from inline uploads or URLs
//! - [`notify`]: Heartbeat callbacks
//! - [`pipeline`]: Validate → fetch → decode → envelope
//! - [`readiness`]: Warm-up state machine behind `/ready`
//! - [`request`]: Form field validation
//! - [`server`]: axum router and listener

pub mod config;
pub mod envelope;
pub mod error;
pub mod exif;
pub mod fetch;
pub mod notify;
pub mod pipeline;
pub mod readiness;
pub mod request;
pub mod server;
