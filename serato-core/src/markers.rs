//! Markers2 record stream
//!
//! After unwrapping, a Markers2 payload is a run of named records:
//!
//! ```text
//! [0x01 0x01] [header\0]          versioned streams only
//! name\0  len:u32be  body[len]    repeated until an empty name
//! ```
//!
//! Older encoders write the record run without the version/header preamble.
//! Only `CUE` records are decoded; `COLOR`, `BPMLOCK`, `LOOP` and friends
//! are kept as opaque bodies.
//!
//! CUE body layout (big-endian):
//! - 0x00: reserved (0)
//! - 0x01: index
//! - 0x02: position in ms (u32)
//! - 0x06: reserved (0)
//! - 0x07: RGB color (3 bytes)
//! - 0x0A: reserved (u16, 0)
//! - 0x0C: label, NUL padded

use std::io::Cursor;

use binrw::BinRead;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::envelope::{decode_inner, unwrap_outer};
use crate::error::{Error, Result};
use crate::reader::ByteReader;
use crate::string::{decode_label, LabelMode};
use crate::track::{CueColor, HotCueEntry};

/// Version bytes that open a versioned stream
const VERSION_HEADER: [u8; 2] = [0x01, 0x01];

/// Record name carrying a hot cue
pub const CUE_RECORD: &str = "CUE";

/// Fixed prefix plus at least one label byte
const MIN_CUE_LEN: usize = 13;
const CUE_LABEL_OFFSET: usize = 12;

/// How a hot-cue tag value is wrapped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkersEncoding {
    /// Two base64 layers (MP4 freeform atoms)
    #[default]
    Nested,
    /// One base64 layer (ID3 GEOB frames)
    Flat,
}

/// Sub-format of a decoded record stream
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamFormat {
    /// `0x01 0x01` version and header string before the records
    Versioned,
    /// Records from the first byte
    Flat,
}

/// One record from a Markers2 stream
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerRecord {
    Cue(HotCueEntry),
    Other { name: String, body: Vec<u8> },
}

impl MarkerRecord {
    pub fn name(&self) -> &str {
        match self {
            MarkerRecord::Cue(_) => CUE_RECORD,
            MarkerRecord::Other { name, .. } => name,
        }
    }
}

/// Records of one stream, in stream order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarkerStream {
    pub format: StreamFormat,
    pub records: Vec<MarkerRecord>,
}

impl MarkerStream {
    fn new(format: StreamFormat) -> Self {
        Self { format, records: Vec::new() }
    }

    pub fn hot_cues(&self) -> impl Iterator<Item = &HotCueEntry> {
        self.records.iter().filter_map(|record| match record {
            MarkerRecord::Cue(cue) => Some(cue),
            MarkerRecord::Other { .. } => None,
        })
    }

    pub fn cue_count(&self) -> usize {
        self.hot_cues().count()
    }

    pub fn into_hot_cues(self) -> Vec<HotCueEntry> {
        self.records
            .into_iter()
            .filter_map(|record| match record {
                MarkerRecord::Cue(cue) => Some(cue),
                MarkerRecord::Other { .. } => None,
            })
            .collect()
    }
}

/// Fixed 12-byte prefix of a CUE body
#[derive(BinRead, Debug)]
#[br(big)]
struct RawCueHeader {
    reserved: u8,
    index: u8,
    position_ms: u32,
    separator: u8,
    color: [u8; 3],
    trailer: u16,
}

/// Decode a `CUE` record body
pub fn parse_cue_entry(body: &[u8], mode: LabelMode) -> Result<HotCueEntry> {
    if body.len() < MIN_CUE_LEN {
        return Err(Error::InvalidRecord(format!(
            "CUE body too short: {} bytes (minimum {})",
            body.len(),
            MIN_CUE_LEN
        )));
    }

    let raw = RawCueHeader::read(&mut Cursor::new(body))?;

    if raw.reserved != 0 || raw.separator != 0 {
        return Err(Error::InvalidRecord(format!(
            "CUE reserved bytes are {:#04x}/{:#04x}, expected zero",
            raw.reserved, raw.separator
        )));
    }
    if raw.trailer != 0 {
        return Err(Error::InvalidRecord(format!(
            "unexpected bytes {:#06x} after CUE color",
            raw.trailer
        )));
    }

    let [red, green, blue] = raw.color;
    Ok(HotCueEntry {
        index: raw.index,
        position_ms: raw.position_ms,
        color: CueColor::new(red, green, blue),
        label: decode_label(&body[CUE_LABEL_OFFSET..], mode),
    })
}

/// Parse a stream that opens with the `0x01 0x01` version and a header string
pub fn parse_versioned(data: &[u8], mode: LabelMode) -> Result<MarkerStream> {
    let mut reader = ByteReader::new(data);

    let version = reader
        .take(2)
        .ok_or_else(|| Error::Truncated("stream shorter than its version bytes".into()))?;
    if version != VERSION_HEADER {
        return Err(Error::ContainerMismatch(format!(
            "unexpected version {:02x}{:02x}",
            version[0], version[1]
        )));
    }

    reader.read_cstr(); // header, unused

    let mut stream = MarkerStream::new(StreamFormat::Versioned);
    read_records(&mut reader, mode, &mut stream);
    Ok(stream)
}

/// Parse a stream with no preamble
pub fn parse_flat(data: &[u8], mode: LabelMode) -> MarkerStream {
    let mut stream = MarkerStream::new(StreamFormat::Flat);
    read_records(&mut ByteReader::new(data), mode, &mut stream);
    stream
}

fn read_records(reader: &mut ByteReader<'_>, mode: LabelMode, stream: &mut MarkerStream) {
    while !reader.is_empty() {
        let name = reader.read_cstr();
        if name.bytes.is_empty() {
            break;
        }
        if !name.terminated {
            debug!("Record name runs to the end of the stream");
            break;
        }

        let Some(len) = reader.read_u32_be() else {
            debug!("Record length cut off at offset {}", reader.position());
            break;
        };
        let Some(body) = reader.take(len as usize) else {
            debug!(
                "Record declares {} bytes but only {} remain, stopping",
                len,
                reader.remaining()
            );
            break;
        };

        let name = String::from_utf8_lossy(name.bytes).into_owned();
        match name.as_str() {
            CUE_RECORD => match parse_cue_entry(body, mode) {
                Ok(cue) => stream.records.push(MarkerRecord::Cue(cue)),
                Err(e) => debug!("Dropping CUE record: {}", e),
            },
            _ => stream.records.push(MarkerRecord::Other { name, body: body.to_vec() }),
        }
    }
}

/// Parse a decoded payload, picking the sub-format.
///
/// Streams that open with `0x01 0x01` are read as versioned first; when that
/// fails or yields no cues the same bytes are read as flat.
pub fn parse_marker_stream(data: &[u8], mode: LabelMode) -> MarkerStream {
    if !data.starts_with(&VERSION_HEADER) {
        return parse_flat(data, mode);
    }

    let versioned = match parse_versioned(data, mode) {
        Ok(stream) if stream.cue_count() > 0 => return stream,
        Ok(stream) => Some(stream),
        Err(e) => {
            debug!("Versioned parse failed: {}", e);
            None
        }
    };

    debug!("No cues in versioned stream, retrying as flat");
    let flat = parse_flat(data, mode);
    match versioned {
        Some(stream) if flat.cue_count() == 0 => stream,
        _ => flat,
    }
}

/// Unwrap a hot-cue tag value and parse its record stream
pub fn try_decode_markers(
    tag: &[u8],
    encoding: MarkersEncoding,
    mode: LabelMode,
) -> Result<MarkerStream> {
    let unwrapped = unwrap_outer(tag)?;
    let payload = match encoding {
        MarkersEncoding::Nested => decode_inner(&unwrapped)?.bytes,
        MarkersEncoding::Flat => unwrapped,
    };
    Ok(parse_marker_stream(&payload, mode))
}

/// Hot cues from a tag value; empty when the value cannot be decoded
pub fn decode_hot_cues_with(
    tag: &[u8],
    encoding: MarkersEncoding,
    mode: LabelMode,
) -> Vec<HotCueEntry> {
    match try_decode_markers(tag, encoding, mode) {
        Ok(stream) => stream.into_hot_cues(),
        Err(e) => {
            warn!("No hot cues decoded: {}", e);
            Vec::new()
        }
    }
}

/// Hot cues from a doubly wrapped Markers2 tag value (text or bytes)
pub fn decode_hot_cues(tag: impl AsRef<[u8]>) -> Vec<HotCueEntry> {
    decode_hot_cues_with(tag.as_ref(), MarkersEncoding::Nested, LabelMode::default())
}

/// Hot cues from a singly wrapped Markers2 tag value (ID3 GEOB data)
pub fn decode_hot_cues_flat(tag: impl AsRef<[u8]>) -> Vec<HotCueEntry> {
    decode_hot_cues_with(tag.as_ref(), MarkersEncoding::Flat, LabelMode::default())
}
