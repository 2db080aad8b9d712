//! Tag dump files
//!
//! A dump is a JSON object mapping tag ids to their values, as text (the
//! usual form for MP4 freeform atoms and Vorbis comments) or as a byte array
//! (ID3 GEOB data):
//!
//! ```json
//! { "----:com.serato:Markers2": "YXBwbGlj...", "GEOB:Serato BeatGrid": [1, 0, 0, 0, 0, 0, 0] }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum TagValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl TagValue {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            TagValue::Text(text) => text.into_bytes(),
            TagValue::Bytes(bytes) => bytes,
        }
    }
}

pub fn parse_tag_dump(json: &str) -> Result<HashMap<String, Vec<u8>>> {
    let values: HashMap<String, TagValue> =
        serde_json::from_str(json).context("Tag dump must map tag ids to strings or byte arrays")?;

    Ok(values
        .into_iter()
        .map(|(id, value)| (id, value.into_bytes()))
        .collect())
}

pub fn read_tag_dump(path: &Path) -> Result<HashMap<String, Vec<u8>>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read tag dump {:?}", path))?;
    parse_tag_dump(&json).with_context(|| format!("Invalid tag dump {:?}", path))
}
