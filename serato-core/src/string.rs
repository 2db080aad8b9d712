//! String decoding for Serato binary fields
//!
//! Serato stores text in three shapes:
//! - Crate track paths: UTF-16BE, length-prefixed, no terminator
//! - Marker names and cue labels: UTF-8, NUL-terminated or NUL-padded
//! - The inner Markers2 payload: base64 text that may contain stray bytes
//!
//! Reference: https://github.com/Holzhaus/serato-tags

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How trailing bytes of a cue label are turned into text.
///
/// Encoder versions disagree: some pad the label with NULs, others write a
/// single terminator followed by leftover bytes. Both readings are kept
/// available instead of guessing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LabelMode {
    /// Strip trailing NULs only; interior NULs survive
    #[default]
    TrimTrailingNul,
    /// Cut the label at the first NUL
    CutAtFirstNul,
}

/// Decode a cue label (UTF-8 with replacement for invalid sequences)
pub fn decode_label(bytes: &[u8], mode: LabelMode) -> String {
    let text = match mode {
        LabelMode::TrimTrailingNul => {
            let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            &bytes[..end]
        }
        LabelMode::CutAtFirstNul => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            &bytes[..end]
        }
    };
    String::from_utf8_lossy(text).into_owned()
}

/// Decode a UTF-16BE byte string
///
/// Fails on odd byte counts and unpaired surrogates.
pub fn decode_utf16_be(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::StringEncoding(format!(
            "UTF-16BE data has odd length {}",
            bytes.len()
        )));
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::StringEncoding(format!("invalid UTF-16BE: {}", e)))
}

/// Interpret bytes as ASCII, replacing anything above 0x7F with U+FFFD
pub fn ascii_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
        .collect()
}
