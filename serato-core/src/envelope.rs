//! Base64 envelopes around the Markers2 payload
//!
//! A Markers2 tag value is wrapped twice:
//!
//! ```text
//! base64(                                  <- outer layer (tag value)
//!   ["application/octet-stream\0" desc "\0"]   optional MIME wrapper
//!   ["Serato Markers2\0" {\0}]                 optional magic header
//!   "\x01\x01" base64(marker stream) {\0}      <- inner layer
//! )
//! ```
//!
//! Both layers are decoded leniently. Captured tags are line wrapped, carry
//! stray bytes and are NUL padded, so the inner layer is decoded with a
//! bounded shrink-and-retry loop.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::debug;

use crate::error::{Error, Result};
use crate::reader::ByteReader;
use crate::string::ascii_lossy;

/// MIME type written in front of MP4 freeform tag data
pub const MIME_PREFIX: &[u8] = b"application/octet-stream";

/// Magic string naming the Markers2 payload
pub const MARKERS2_MAGIC: &[u8] = b"Serato Markers2";

/// Characters of the inner layer that precede the base64 body
const INNER_PREFIX_CHARS: usize = 2;

/// Standard alphabet; padding optional, non-zero trailing bits accepted
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Result of [`decode_with_shrink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrunkDecode {
    pub bytes: Vec<u8>,
    /// Characters removed from the end before decoding succeeded
    pub dropped: usize,
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

/// Keep only `[A-Za-z0-9+/=]` (drops newlines and any other stray byte)
pub fn clean_base64(payload: &[u8]) -> Vec<u8> {
    payload.iter().copied().filter(|&b| is_base64_byte(b)).collect()
}

/// Pad with `=` up to a multiple of 4
pub fn pad_base64(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(b'=');
    }
}

/// Decode the outer layer of a Markers2 tag value and strip its headers
pub fn unwrap_outer(payload: &[u8]) -> Result<Vec<u8>> {
    let mut clean = clean_base64(payload);
    pad_base64(&mut clean);

    let decoded = LENIENT.decode(&clean)?;
    Ok(strip_headers(&decoded).to_vec())
}

/// Skip the optional MIME wrapper and `Serato Markers2` magic
fn strip_headers(decoded: &[u8]) -> &[u8] {
    let mut reader = ByteReader::new(decoded);

    if decoded.starts_with(MIME_PREFIX) {
        reader.read_cstr(); // MIME type
        reader.read_cstr(); // descriptor
        debug!("Stripped MIME wrapper, {} bytes remain", reader.remaining());
    }

    if reader.rest().starts_with(MARKERS2_MAGIC) {
        reader.read_cstr();
        reader.skip_nuls();
    }

    reader.rest()
}

/// Decode the inner layer produced by [`unwrap_outer`]
pub fn decode_inner(unwrapped: &[u8]) -> Result<ShrunkDecode> {
    let text: Vec<char> = ascii_lossy(unwrapped)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if text.len() < INNER_PREFIX_CHARS {
        return Err(Error::Structure(format!(
            "inner payload too short ({} characters)",
            text.len()
        )));
    }

    // stray bytes inside the body are skipped, not treated as its end
    let mut body: String = text[INNER_PREFIX_CHARS..]
        .iter()
        .copied()
        .filter(|&c| c.is_ascii() && is_base64_byte(c as u8))
        .collect();
    let pad = (4 - body.len() % 4) % 4;
    body.extend(std::iter::repeat('=').take(pad));

    let decoded = decode_with_shrink(&body)?;
    if decoded.dropped > 0 {
        debug!("Inner payload decoded after dropping {} trailing characters", decoded.dropped);
    }
    Ok(decoded)
}

/// Decode base64, dropping the last character after each failure.
///
/// Makes at most one attempt per character; the empty string is never
/// attempted, so an undecodable input is an error rather than an empty
/// buffer.
pub fn decode_with_shrink(text: &str) -> Result<ShrunkDecode> {
    let mut attempt = text.to_string();
    let max_attempts = attempt.chars().count();

    for dropped in 0..max_attempts {
        match LENIENT.decode(attempt.as_bytes()) {
            Ok(bytes) => return Ok(ShrunkDecode { bytes, dropped }),
            Err(_) => {
                attempt.pop();
            }
        }
    }

    Err(Error::Base64(format!(
        "no decodable prefix after {} attempts",
        max_attempts
    )))
}
