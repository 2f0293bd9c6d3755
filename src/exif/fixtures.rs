//! Synthesized image chunks for tests.
//!
//! The EXIF fixtures are a minimal big-endian TIFF structure (IFD0, an Exif
//! sub-IFD and a thumbnail IFD1), optionally wrapped in a JPEG APP1 segment.
//! This file is also mounted by the integration tests, so it must not refer
//! to crate paths.

#![allow(dead_code)]

/// `DateTime` value carried in IFD0.
pub const DATE_TIME: &str = "2008:07:31 10:38:11";

const ASCII: u16 = 2;
const SHORT: u16 = 3;
const LONG: u16 = 4;
const RATIONAL: u16 = 5;

const TIFF_HEADER_LEN: usize = 8;

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

fn ascii(tag: u16, text: &str) -> Entry {
    let mut data = text.as_bytes().to_vec();
    data.push(0);
    Entry { tag, kind: ASCII, count: data.len() as u32, data }
}

fn short(tag: u16, value: u16) -> Entry {
    Entry { tag, kind: SHORT, count: 1, data: value.to_be_bytes().to_vec() }
}

fn long(tag: u16, value: u32) -> Entry {
    Entry { tag, kind: LONG, count: 1, data: value.to_be_bytes().to_vec() }
}

fn rational(tag: u16, num: u32, denom: u32) -> Entry {
    let mut data = num.to_be_bytes().to_vec();
    data.extend_from_slice(&denom.to_be_bytes());
    Entry { tag, kind: RATIONAL, count: 1, data }
}

fn padded(len: usize) -> usize {
    len + len % 2
}

/// Bytes taken by an IFD plus the out-of-line values that follow it.
fn ifd_size(entries: &[Entry]) -> usize {
    let table = 2 + 12 * entries.len() + 4;
    let values: usize = entries
        .iter()
        .filter(|e| e.data.len() > 4)
        .map(|e| padded(e.data.len()))
        .sum();
    table + values
}

fn write_ifd(out: &mut Vec<u8>, entries: &[Entry], next_ifd: u32) {
    let mut value_offset = out.len() + 2 + 12 * entries.len() + 4;
    let mut values = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag.to_be_bytes());
        out.extend_from_slice(&entry.kind.to_be_bytes());
        out.extend_from_slice(&entry.count.to_be_bytes());
        if entry.data.len() <= 4 {
            let mut inline = entry.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&(value_offset as u32).to_be_bytes());
            values.extend_from_slice(&entry.data);
            if entry.data.len() % 2 == 1 {
                values.push(0);
            }
            value_offset += padded(entry.data.len());
        }
    }
    out.extend_from_slice(&next_ifd.to_be_bytes());
    out.extend_from_slice(&values);
}

fn ifd0(exif_ifd_offset: u32) -> Vec<Entry> {
    vec![
        ascii(0x010F, "Canon"),
        rational(0x011A, 72, 1),
        short(0x0128, 2),
        ascii(0x0132, DATE_TIME),
        long(0x8769, exif_ifd_offset),
    ]
}

/// A standalone TIFF carrying IFD0, an Exif sub-IFD and a thumbnail IFD1.
pub fn tiff_with_exif() -> Vec<u8> {
    let exif_ifd = vec![short(0xA002, 100), short(0xA003, 68)];
    let ifd1 = vec![short(0x0103, 6), rational(0x011A, 300, 1)];

    let exif_offset = TIFF_HEADER_LEN + ifd_size(&ifd0(0));
    let ifd1_offset = exif_offset + ifd_size(&exif_ifd);

    let mut out = b"MM\x00\x2a".to_vec();
    out.extend_from_slice(&(TIFF_HEADER_LEN as u32).to_be_bytes());
    write_ifd(&mut out, &ifd0(exif_offset as u32), ifd1_offset as u32);
    write_ifd(&mut out, &exif_ifd, 0);
    write_ifd(&mut out, &ifd1, 0);
    out
}

/// A JPEG whose APP1 segment carries [`tiff_with_exif`].
pub fn jpeg_with_exif() -> Vec<u8> {
    let tiff = tiff_with_exif();
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// A JPEG with no APP1 segment at all.
pub fn jpeg_without_exif() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xD9]
}

/// The header of an animated GIF; no EXIF container format matches it.
pub fn gif() -> Vec<u8> {
    let mut out = b"GIF89a".to_vec();
    out.extend_from_slice(&[0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00]);
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x3B]);
    out
}
