//! serato-core: Serato DJ metadata decoding
//!
//! This crate decodes the binary side of a Serato library:
//! - Markers2 hot cues (base64 wrapped record stream) - big-endian
//! - BeatGrid markers (MP4 base64 container or raw ID3 GEOB data) - big-endian
//! - `.crate` track paths (UTF-16BE)
//!
//! Tag values come in as bytes from a [`TagProvider`]; reading audio
//! containers is left to the caller. Decoding never panics on malformed
//! input: the public entry points degrade to empty or partial results.

pub mod beatgrid;
pub mod crate_file;
pub mod envelope;
pub mod error;
pub mod markers;
mod reader;
pub mod string;
pub mod tags;
pub mod track;

pub use beatgrid::{decode_beatgrid, try_decode_beatgrid, BeatGridContainer};
pub use crate_file::{crate_display_name, decode_crate_paths, CratePath, CrateScan};
pub use error::{Error, Result};
pub use markers::{decode_hot_cues, decode_hot_cues_flat, decode_hot_cues_with, MarkersEncoding};
pub use string::LabelMode;
pub use tags::{decode_track_markers, BeatGridTag, DecodeConfig, HotCueTag, TagProvider};
pub use track::{BeatGrid, BeatGridMarker, CueColor, HotCueEntry, TrackMarkers};
