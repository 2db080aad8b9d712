//! Tag candidate resolution
//!
//! Serato writes the same data under different tag ids depending on the
//! container and the software version. A [`DecodeConfig`] lists the ids to
//! try, in order; the first one that decodes to something non-empty wins.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beatgrid::{decode_beatgrid, BeatGridContainer};
use crate::error::Result;
use crate::markers::{decode_hot_cues_with, MarkersEncoding};
use crate::string::LabelMode;
use crate::track::{BeatGrid, HotCueEntry, TrackMarkers};

/// Source of raw tag values for one track
///
/// Implementations read whatever container the track lives in; the decoders
/// only ever see the bytes.
pub trait TagProvider {
    fn tag_bytes(&self, id: &str) -> Option<Cow<'_, [u8]>>;
}

impl TagProvider for HashMap<String, Vec<u8>> {
    fn tag_bytes(&self, id: &str) -> Option<Cow<'_, [u8]>> {
        self.get(id).map(|v| Cow::Borrowed(v.as_slice()))
    }
}

impl<P: TagProvider + ?Sized> TagProvider for &P {
    fn tag_bytes(&self, id: &str) -> Option<Cow<'_, [u8]>> {
        (**self).tag_bytes(id)
    }
}

/// Hot cue tag id and how its value is wrapped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotCueTag {
    pub id: String,
    #[serde(default)]
    pub encoding: MarkersEncoding,
}

impl HotCueTag {
    pub fn new(id: impl Into<String>, encoding: MarkersEncoding) -> Self {
        Self { id: id.into(), encoding }
    }
}

/// Beat grid tag id and its container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatGridTag {
    pub id: String,
    pub container: BeatGridContainer,
}

impl BeatGridTag {
    pub fn new(id: impl Into<String>, container: BeatGridContainer) -> Self {
        Self { id: id.into(), container }
    }
}

/// Candidate tag lists and decoding options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Hot cue candidates, tried in order
    pub hot_cue_tags: Vec<HotCueTag>,
    /// Beat grid candidates, tried in order
    pub beatgrid_tags: Vec<BeatGridTag>,
    pub label_mode: LabelMode,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            hot_cue_tags: vec![
                HotCueTag::new("----:com.serato:Markers2", MarkersEncoding::Nested),
                HotCueTag::new("----:com.serato:markers_", MarkersEncoding::Nested),
                HotCueTag::new("----:com.serato.dj:markersv2", MarkersEncoding::Nested),
                HotCueTag::new("SERATO_MARKERS_V2", MarkersEncoding::Nested),
                HotCueTag::new("GEOB:Serato Markers2", MarkersEncoding::Flat),
            ],
            beatgrid_tags: vec![
                BeatGridTag::new("----:com.serato.dj:beatgrid", BeatGridContainer::Mp4Wrapped),
                BeatGridTag::new("GEOB:Serato BeatGrid", BeatGridContainer::RawBinary),
            ],
            label_mode: LabelMode::default(),
        }
    }
}

impl DecodeConfig {
    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Hot cues from the first candidate tag that yields any
pub fn resolve_hot_cues<P: TagProvider + ?Sized>(
    provider: &P,
    config: &DecodeConfig,
) -> Vec<HotCueEntry> {
    for tag in &config.hot_cue_tags {
        let Some(value) = provider.tag_bytes(&tag.id) else {
            continue;
        };

        let cues = decode_hot_cues_with(&value, tag.encoding, config.label_mode);
        if !cues.is_empty() {
            debug!("{} hot cues from {}", cues.len(), tag.id);
            return cues;
        }
        debug!("Tag {} present but holds no hot cues", tag.id);
    }
    Vec::new()
}

/// Beat grid from the first candidate tag that yields a marker
pub fn resolve_beatgrid<P: TagProvider + ?Sized>(provider: &P, config: &DecodeConfig) -> BeatGrid {
    for tag in &config.beatgrid_tags {
        let Some(value) = provider.tag_bytes(&tag.id) else {
            continue;
        };

        let grid = decode_beatgrid(&value, tag.container);
        if !grid.is_empty() {
            debug!("{} beat grid markers from {}", grid.len(), tag.id);
            return grid;
        }
        debug!("Tag {} present but holds no beat grid", tag.id);
    }
    BeatGrid::default()
}

/// Decode hot cues and beat grid of one track
pub fn decode_track_markers<P: TagProvider + ?Sized>(
    provider: &P,
    config: &DecodeConfig,
) -> TrackMarkers {
    TrackMarkers {
        hot_cues: resolve_hot_cues(provider, config),
        beat_grid: resolve_beatgrid(provider, config),
    }
}
