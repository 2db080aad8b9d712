//! Serato `.crate` track path extraction
//!
//! A crate file is a tree of tagged blocks (`vrsn`, `osrt`, `otrk`, ...).
//! Only the track paths matter here, and each one is stored as
//!
//! ```text
//! "ptrk"  len:u32be  UTF-16BE path[len]
//! ```
//!
//! so the file is scanned for the `ptrk` marker instead of walking the tree.

use std::collections::HashSet;
use std::fmt;
use std::path::{PathBuf, MAIN_SEPARATOR};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Error;
use crate::reader::ByteReader;
use crate::string::decode_utf16_be;

/// Tag in front of every track path
pub const TRACK_PATH_MARKER: &[u8; 4] = b"ptrk";

/// Separator Serato uses for nested crate names in file names
const SUBCRATE_SEPARATOR: &str = "%%";

/// Track path as stored in the crate, separators untouched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CratePath(String);

impl CratePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Path usable on this host: backslashes become the native separator
    /// and, outside Windows, a missing leading separator is added (Serato
    /// stores paths relative to the volume root).
    pub fn lookup_path(&self) -> PathBuf {
        let normalized: String = self
            .0
            .chars()
            .map(|c| if c == '\\' { MAIN_SEPARATOR } else { c })
            .collect();

        if cfg!(windows) || normalized.starts_with(MAIN_SEPARATOR) {
            PathBuf::from(normalized)
        } else {
            PathBuf::from(format!("{}{}", MAIN_SEPARATOR, normalized))
        }
    }
}

impl fmt::Display for CratePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CratePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of scanning one crate file
#[derive(Debug, Clone, Default)]
pub struct CrateScan {
    /// Unique paths in first-seen order
    pub paths: Vec<CratePath>,
    /// Structural problems met while scanning
    pub errors: Vec<Error>,
}

impl CrateScan {
    fn add_error(&mut self, error: Error) {
        warn!("Malformed crate: {}", error);
        self.errors.push(error);
    }

    /// True when the whole file scanned without errors
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn path_strings(&self) -> Vec<String> {
        self.paths.iter().map(|p| p.as_str().to_string()).collect()
    }
}

/// Extract the track paths of a crate file
///
/// Never fails: a malformed file yields the paths found before the damage
/// plus an entry in `errors`.
pub fn decode_crate_paths(data: &[u8]) -> CrateScan {
    let mut scan = CrateScan::default();
    let mut seen = HashSet::new();
    let mut reader = ByteReader::new(data);

    while let Some(marker_at) = reader.seek_past(TRACK_PATH_MARKER) {
        let Some(len) = reader.read_u32_be() else {
            scan.add_error(Error::Truncated(format!(
                "file ends inside the length of the path marker at offset {}",
                marker_at
            )));
            break;
        };

        let start = reader.position();
        let Some(raw) = reader.take(len as usize) else {
            scan.add_error(Error::Structure(format!(
                "path length {} at offset {} exceeds the {} remaining bytes",
                len,
                start,
                reader.remaining()
            )));
            break;
        };

        match decode_utf16_be(raw) {
            Ok(path) => {
                let path = path.trim().to_string();
                if seen.insert(path.clone()) {
                    scan.paths.push(CratePath(path));
                } else {
                    debug!("Skipping duplicate crate entry {:?}", path);
                }
            }
            Err(e) => scan.add_error(Error::StringEncoding(format!(
                "path of {} bytes at offset {} not decodable ({})",
                len, start, e
            ))),
        }
    }

    scan
}

/// Display name for a crate file stem: `Parent%%Child` becomes
/// `Parent [Child]`. Deeper levels are dropped.
pub fn crate_display_name(stem: &str) -> String {
    let mut parts = stem.split(SUBCRATE_SEPARATOR);
    match (parts.next(), parts.next()) {
        (Some(parent), Some(child)) => format!("{} [{}]", parent, child),
        _ => stem.to_string(),
    }
}
