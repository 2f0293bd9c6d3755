use anyhow::{Context, Result};
use serde_json::{Map, Number, Value};
use std::io::Cursor;
use std::path::Path;

const ERROR_PREFIX: &str = "exif: ";

/// Decoded tags, keyed by EXIF tag name, in the decoder's enumeration order.
pub type TagMap = Map<String, Value>;

/// Outcome of decoding one chunk: the tag map, or a human-readable reason.
///
/// Decode failures are ordinary data here, never an error the caller has to
/// propagate.
pub type MetadataResult = std::result::Result<TagMap, String>;

/// Decode the EXIF block embedded in a JPEG or TIFF byte stream.
///
/// Primary-image fields (IFD0 plus its Exif, GPS and interoperability
/// sub-IFDs) come first. Fields from later IFDs such as the thumbnail are only
/// added when their tag name has not been seen yet.
pub fn decode_exif(bytes: &[u8]) -> MetadataResult {
    let exif = match ::exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            log::debug!("No EXIF data decoded ({} bytes): {e}", bytes.len());
            return Err(format!("{ERROR_PREFIX}{e}"));
        }
    };

    let (primary, others): (Vec<_>, Vec<_>) = exif
        .fields()
        .partition(|field| field.ifd_num == ::exif::In::PRIMARY);

    let mut tags = TagMap::new();
    for field in primary.into_iter().chain(others) {
        let name = field.tag.to_string();
        if tags.contains_key(&name) {
            continue;
        }
        tags.insert(name, value_to_json(&field.value));
    }

    if tags.is_empty() {
        return Err(format!("{ERROR_PREFIX}no EXIF fields found"));
    }

    log::debug!("Decoded {} EXIF tag(s)", tags.len());
    Ok(tags)
}

/// Read a local image file and decode its EXIF block.
///
/// Only I/O problems are returned as errors; decode failures are inside the
/// returned [`MetadataResult`].
pub fn read_exif(path: &Path) -> Result<MetadataResult> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image file {}", path.display()))?;
    Ok(decode_exif(&bytes))
}

/// Convert a raw EXIF value into its JSON form.
///
/// Numeric components stay arrays even for single values, rationals become
/// `"num/denom"` strings, and ASCII becomes plain text.
fn value_to_json(value: &::exif::Value) -> Value {
    use ::exif::Value as Raw;

    match value {
        Raw::Ascii(strings) => match strings.as_slice() {
            [] => Value::String(String::new()),
            [single] => Value::String(ascii_text(single)),
            many => Value::Array(many.iter().map(|s| Value::String(ascii_text(s))).collect()),
        },
        Raw::Byte(v) => integers(v.iter().map(|&n| i64::from(n))),
        Raw::Short(v) => integers(v.iter().map(|&n| i64::from(n))),
        Raw::Long(v) => integers(v.iter().map(|&n| i64::from(n))),
        Raw::SByte(v) => integers(v.iter().map(|&n| i64::from(n))),
        Raw::SShort(v) => integers(v.iter().map(|&n| i64::from(n))),
        Raw::SLong(v) => integers(v.iter().map(|&n| i64::from(n))),
        Raw::Rational(v) => Value::Array(
            v.iter()
                .map(|r| Value::String(format!("{}/{}", r.num, r.denom)))
                .collect(),
        ),
        Raw::SRational(v) => Value::Array(
            v.iter()
                .map(|r| Value::String(format!("{}/{}", r.num, r.denom)))
                .collect(),
        ),
        Raw::Float(v) => floats(v.iter().map(|&n| f64::from(n))),
        Raw::Double(v) => floats(v.iter().copied()),
        Raw::Undefined(bytes, _) => undefined_to_json(bytes),
        _ => Value::Null,
    }
}

fn integers(values: impl Iterator<Item = i64>) -> Value {
    Value::Array(values.map(Value::from).collect())
}

fn floats(values: impl Iterator<Item = f64>) -> Value {
    Value::Array(
        values
            .map(|n| Number::from_f64(n).map_or(Value::Null, Value::Number))
            .collect(),
    )
}

fn ascii_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(trim_nuls(bytes)).into_owned()
}

/// UNDEFINED payloads that are plain printable ASCII (version tags, interop
/// index) read better as text; anything else stays a byte array.
fn undefined_to_json(bytes: &[u8]) -> Value {
    let trimmed = trim_nuls(bytes);
    if trimmed.iter().all(|b| (0x20..=0x7e).contains(b)) {
        Value::String(String::from_utf8_lossy(trimmed).into_owned())
    } else {
        integers(bytes.iter().map(|&n| i64::from(n)))
    }
}

fn trim_nuls(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}
