//! Serato BeatGrid tag decoding
//!
//! The grid itself is **big-endian** and identical in both containers:
//!
//! ```text
//! 0x00  version (2 bytes, 01 00)
//! 0x02  marker count (u32)
//! 0x06  markers, 8 bytes each:
//!         position (f32, seconds)
//!         beats to next marker (u32)   non-terminal markers
//!         bpm (f32)                    last marker
//! ....  footer (1 byte)
//! ```
//!
//! ID3 `GEOB:Serato BeatGrid` frames carry the grid as-is. MP4 freeform
//! atoms base64 encode it behind a MIME string and a `Serato BeatGrid\0`
//! marker, often with a stray trailing character.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use binrw::BinRead;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::envelope::pad_base64;
use crate::error::{Error, Result};
use crate::track::{BeatGrid, BeatGridMarker};

/// Marker string in front of the grid inside the MP4 payload
pub const BEATGRID_MAGIC: &[u8] = b"Serato BeatGrid\0";

/// Version written by current encoders
const GRID_VERSION: [u8; 2] = [0x01, 0x00];

const HEADER_LEN: u64 = 6;
const MARKER_LEN: u64 = 8;
const FOOTER_LEN: u64 = 1;

/// Which container the beat grid tag came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BeatGridContainer {
    /// MP4 freeform atom: base64 with MIME prefix and magic string
    Mp4Wrapped,
    /// ID3 GEOB frame (and other binary tags): the grid bytes directly
    RawBinary,
}

#[derive(BinRead, Debug)]
#[br(big)]
struct GridHeader {
    version: [u8; 2],
    marker_count: u32,
}

#[derive(BinRead, Debug)]
#[br(big)]
struct RawMarker {
    position: f32,
    data: [u8; 4],
}

/// Decode a beat grid tag value, surfacing structural errors
pub fn try_decode_beatgrid(tag: &[u8], container: BeatGridContainer) -> Result<BeatGrid> {
    match container {
        BeatGridContainer::Mp4Wrapped => decode_wrapped(tag),
        BeatGridContainer::RawBinary => decode_raw(tag),
    }
}

/// Decode a beat grid tag value; an undecodable value is an empty grid
pub fn decode_beatgrid(tag: impl AsRef<[u8]>, container: BeatGridContainer) -> BeatGrid {
    match try_decode_beatgrid(tag.as_ref(), container) {
        Ok(grid) => grid,
        Err(e) => {
            warn!("No beat grid decoded ({:?}): {}", container, e);
            BeatGrid::default()
        }
    }
}

fn decode_raw(tag: &[u8]) -> Result<BeatGrid> {
    let mut cursor = Cursor::new(tag);
    let header = GridHeader::read(&mut cursor)
        .map_err(|_| Error::Truncated(format!("beat grid of {} bytes has no header", tag.len())))?;

    if header.version != GRID_VERSION {
        warn!(
            "Unsupported beat grid version {:02x}{:02x}, parsing anyway",
            header.version[0], header.version[1]
        );
    }

    let markers = read_markers(&mut cursor, header.marker_count);
    // the footer byte after the markers carries nothing
    Ok(BeatGrid::from_markers(markers))
}

fn decode_wrapped(tag: &[u8]) -> Result<BeatGrid> {
    let decoded = unwrap_base64(tag)?;

    let split = decoded
        .windows(2)
        .position(|pair| pair == [0x00, 0x00])
        .ok_or_else(|| Error::Structure("no double-NUL separator in beat grid payload".into()))?;

    let grid = decoded[split + 2..]
        .strip_prefix(BEATGRID_MAGIC)
        .ok_or_else(|| Error::Structure("missing 'Serato BeatGrid' marker".into()))?;

    if (grid.len() as u64) < HEADER_LEN + FOOTER_LEN {
        return Err(Error::Structure(format!(
            "beat grid too short for header and footer: {} bytes",
            grid.len()
        )));
    }

    let mut cursor = Cursor::new(grid);
    let header = GridHeader::read(&mut cursor)?;

    let expected = HEADER_LEN + u64::from(header.marker_count) * MARKER_LEN + FOOTER_LEN;
    if grid.len() as u64 != expected {
        warn!(
            "Beat grid is {} bytes, {} markers need {}",
            grid.len(),
            header.marker_count,
            expected
        );
    }

    let markers = read_markers(&mut cursor, header.marker_count);
    Ok(BeatGrid::from_markers(markers))
}

/// Base64 decode an MP4 beat grid value.
///
/// The value usually ends in one stray character, so the value minus its
/// last byte is tried first and kept only if it decodes cleanly.
fn unwrap_base64(tag: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = tag.iter().copied().filter(|&b| b != b'\n').collect();

    if let Some((_, trimmed)) = cleaned.split_last() {
        let mut trimmed = trimmed.to_vec();
        pad_base64(&mut trimmed);
        match STANDARD.decode(&trimmed) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => debug!("Trimmed beat grid value did not decode ({}), using full value", e),
        }
    }

    let mut full = cleaned;
    pad_base64(&mut full);
    Ok(STANDARD.decode(&full)?)
}

/// Read up to `count` markers; the last one is terminal.
///
/// Stops at the first short read, returning what was read.
fn read_markers(cursor: &mut Cursor<&[u8]>, count: u32) -> Vec<BeatGridMarker> {
    let remaining = (cursor.get_ref().len() as u64).saturating_sub(cursor.position());
    let fits = (remaining / MARKER_LEN).min(u64::from(count));
    let mut markers = Vec::with_capacity(fits as usize);

    for i in 0..count {
        let raw = match RawMarker::read(cursor) {
            Ok(raw) => raw,
            Err(_) => {
                warn!("Beat grid truncated after {} of {} markers", i, count);
                break;
            }
        };

        let marker = if i == count - 1 {
            BeatGridMarker::Terminal { position: raw.position, bpm: f32::from_be_bytes(raw.data) }
        } else {
            BeatGridMarker::NonTerminal {
                position: raw.position,
                beats_to_next: u32::from_be_bytes(raw.data),
            }
        };
        markers.push(marker);
    }

    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_terminal(position: f32, beats: u32) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&position.to_be_bytes());
        out[4..].copy_from_slice(&beats.to_be_bytes());
        out
    }

    fn terminal(position: f32, bpm: f32) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&position.to_be_bytes());
        out[4..].copy_from_slice(&bpm.to_be_bytes());
        out
    }

    fn grid(version: [u8; 2], count: u32, markers: &[[u8; 8]], footer: bool) -> Vec<u8> {
        let mut data = version.to_vec();
        data.extend_from_slice(&count.to_be_bytes());
        for m in markers {
            data.extend_from_slice(m);
        }
        if footer {
            data.push(0x00);
        }
        data
    }

    /// MP4 atom value: base64 of MIME + magic + grid, line wrapped, stray tail
    fn wrap_mp4(grid: &[u8]) -> Vec<u8> {
        let mut raw = b"application/octet-stream\0\0".to_vec();
        raw.extend_from_slice(BEATGRID_MAGIC);
        raw.extend_from_slice(grid);

        let encoded = STANDARD.encode(raw);
        let mut value = Vec::new();
        for line in encoded.as_bytes().chunks(72) {
            value.extend_from_slice(line);
            value.push(b'\n');
        }
        value.push(b'A');
        value
    }

    fn three_marker_grid() -> Vec<u8> {
        grid(
            GRID_VERSION,
            3,
            &[non_terminal(0.25, 64), non_terminal(30.5, 128), terminal(90.0, 126.0)],
            true,
        )
    }

    #[test]
    fn test_raw_empty_grid() {
        let result =
            decode_beatgrid(grid(GRID_VERSION, 0, &[], true), BeatGridContainer::RawBinary);
        assert!(result.non_terminal.is_empty());
        assert!(result.terminal.is_none());
    }

    #[test]
    fn test_raw_single_terminal() {
        let data = grid(GRID_VERSION, 1, &[terminal(0.5, 120.0)], true);
        let result = decode_beatgrid(&data, BeatGridContainer::RawBinary);
        assert!(result.non_terminal.is_empty());
        let t = result.terminal.unwrap();
        assert_eq!(t.position, 0.5);
        assert_eq!(t.bpm, 120.0);
    }

    #[test]
    fn test_raw_three_markers_in_order() {
        let result = decode_beatgrid(three_marker_grid(), BeatGridContainer::RawBinary);
        assert_eq!(result.non_terminal.len(), 2);
        assert_eq!(result.non_terminal[0].position, 0.25);
        assert_eq!(result.non_terminal[0].beats_to_next, 64);
        assert_eq!(result.non_terminal[1].position, 30.5);
        assert_eq!(result.non_terminal[1].beats_to_next, 128);
        assert_eq!(result.bpm(), Some(126.0));
    }

    #[test]
    fn test_raw_version_mismatch_still_parses() {
        let data = grid([0x02, 0x00], 1, &[terminal(1.0, 100.0)], true);
        let result = decode_beatgrid(&data, BeatGridContainer::RawBinary);
        assert_eq!(result.bpm(), Some(100.0));
    }

    #[test]
    fn test_raw_truncated_returns_partial() {
        let mut data = grid(GRID_VERSION, 3, &[non_terminal(0.25, 64)], false);
        data.extend_from_slice(&[0x41, 0xF4]); // half a marker
        let result = decode_beatgrid(&data, BeatGridContainer::RawBinary);
        assert_eq!(result.non_terminal.len(), 1);
        assert!(result.terminal.is_none());
    }

    #[test]
    fn test_raw_missing_footer_is_fine() {
        let data = grid(GRID_VERSION, 1, &[terminal(0.0, 174.0)], false);
        assert_eq!(decode_beatgrid(&data, BeatGridContainer::RawBinary).bpm(), Some(174.0));
    }

    #[test]
    fn test_raw_short_header() {
        assert!(matches!(
            try_decode_beatgrid(&[0x01, 0x00, 0x00], BeatGridContainer::RawBinary),
            Err(Error::Truncated(_))
        ));
        assert!(decode_beatgrid([0x01], BeatGridContainer::RawBinary).is_empty());
    }

    #[test]
    fn test_raw_huge_count_is_bounded_by_data() {
        let data = grid(GRID_VERSION, u32::MAX, &[non_terminal(0.0, 4)], true);
        let result = decode_beatgrid(&data, BeatGridContainer::RawBinary);
        assert_eq!(result.non_terminal.len(), 1);
        assert!(result.terminal.is_none());
    }

    #[test]
    fn test_mp4_counts() {
        let empty = decode_beatgrid(
            wrap_mp4(&grid(GRID_VERSION, 0, &[], true)),
            BeatGridContainer::Mp4Wrapped,
        );
        assert!(empty.is_empty());

        let single = decode_beatgrid(
            wrap_mp4(&grid(GRID_VERSION, 1, &[terminal(0.5, 128.0)], true)),
            BeatGridContainer::Mp4Wrapped,
        );
        assert!(single.non_terminal.is_empty());
        assert_eq!(single.bpm(), Some(128.0));

        let three = decode_beatgrid(wrap_mp4(&three_marker_grid()), BeatGridContainer::Mp4Wrapped);
        assert_eq!(three.non_terminal.len(), 2);
        assert_eq!(three.non_terminal[0].beats_to_next, 64);
        assert_eq!(three.non_terminal[1].beats_to_next, 128);
        assert_eq!(three.terminal.map(|t| t.position), Some(90.0));
    }

    #[test]
    fn test_mp4_without_stray_byte() {
        let mut raw = b"application/octet-stream\0\0".to_vec();
        raw.extend_from_slice(BEATGRID_MAGIC);
        raw.extend_from_slice(&grid(GRID_VERSION, 0, &[], true));
        // 49 bytes: the encoding ends in "==", so trimming only drops padding
        let value = STANDARD.encode(&raw);
        assert!(value.ends_with("=="));
        assert!(try_decode_beatgrid(value.as_bytes(), BeatGridContainer::Mp4Wrapped).is_ok());
    }

    #[test]
    fn test_mp4_length_mismatch_is_not_fatal() {
        let data = grid(GRID_VERSION, 3, &[non_terminal(1.0, 32), non_terminal(2.0, 32)], false);
        let result = try_decode_beatgrid(&wrap_mp4(&data), BeatGridContainer::Mp4Wrapped).unwrap();
        assert_eq!(result.non_terminal.len(), 2);
        assert!(result.terminal.is_none());
    }

    #[test]
    fn test_mp4_missing_magic() {
        let value = STANDARD.encode(b"application/octet-stream\0\0Serato Autotags\0\x01\x00");
        assert!(matches!(
            try_decode_beatgrid(value.as_bytes(), BeatGridContainer::Mp4Wrapped),
            Err(Error::Structure(_))
        ));
    }

    #[test]
    fn test_mp4_without_mime_prefix() {
        let value = STANDARD.encode(b"Serato BeatGrid\0\x01\x00\x00\x00\x00\x00\x00");
        assert!(try_decode_beatgrid(value.as_bytes(), BeatGridContainer::Mp4Wrapped).is_err());
    }

    #[test]
    fn test_mp4_too_short_after_magic() {
        let mut raw = b"application/octet-stream\0\0".to_vec();
        raw.extend_from_slice(BEATGRID_MAGIC);
        raw.extend_from_slice(&[0x01, 0x00, 0x00]);
        let value = STANDARD.encode(&raw);
        assert!(matches!(
            try_decode_beatgrid(value.as_bytes(), BeatGridContainer::Mp4Wrapped),
            Err(Error::Structure(_))
        ));
    }

    #[test]
    fn test_unwrap_falls_back_to_full_value() {
        // "QUJ=" keeps non-zero trailing bits, so only the full value is clean
        assert_eq!(unwrap_base64(b"QUJD").unwrap(), b"ABC".to_vec());
        assert_eq!(unwrap_base64(b"QUJDA").unwrap(), b"ABC".to_vec());
        assert!(unwrap_base64(b"Q*JD!").is_err());
    }
}
