//! EXIF metadata decoding.
//!
//! [`decode_exif`] wraps the `kamadak-exif` tag parser and turns its output
//! into a [`MetadataResult`]: an ordered tag map on success, a reason string
//! on failure. Decoding never returns an error to the caller.

mod reader;

#[cfg(test)]
pub(crate) mod fixtures;

pub use reader::{MetadataResult, TagMap, decode_exif, read_exif};
