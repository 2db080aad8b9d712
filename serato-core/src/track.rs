//! Decoded per-track marker data
//!
//! These are the typed records produced from Serato's tag payloads. They
//! are plain values: built once per decode call and handed to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Everything decoded from one track's tags
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackMarkers {
    /// Hot cues in stream order
    pub hot_cues: Vec<HotCueEntry>,
    /// Beat grid (empty when the track has none)
    pub beat_grid: BeatGrid,
}

/// RGB color of a hot cue, serialized as `#RRGGBB`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(into = "String", try_from = "String")]
pub struct CueColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl CueColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// `#RRGGBB`, upper-case
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

impl fmt::Display for CueColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl From<CueColor> for String {
    fn from(color: CueColor) -> Self {
        color.hex()
    }
}

impl TryFrom<String> for CueColor {
    type Error = Error;

    fn try_from(text: String) -> Result<Self> {
        let digits = text.strip_prefix('#').unwrap_or(text.as_str());
        let value = Some(digits)
            .filter(|d| d.len() == 6 && d.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|d| u32::from_str_radix(d, 16).ok())
            .ok_or_else(|| {
                Error::Config(format!("invalid color {:?}, expected #RRGGBB", text))
            })?;

        let [_, red, green, blue] = value.to_be_bytes();
        Ok(Self { red, green, blue })
    }
}

/// Hot cue from a Markers2 `CUE` record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HotCueEntry {
    /// Slot index (0 = first pad). Not guaranteed unique.
    pub index: u8,
    /// Position from track start in milliseconds
    pub position_ms: u32,
    pub color: CueColor,
    pub label: String,
}

impl HotCueEntry {
    pub fn position_secs(&self) -> f64 {
        self.position_ms as f64 / 1000.0
    }
}

/// Beat grid marker that carries the beat count to the next marker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NonTerminalMarker {
    /// Position in seconds
    pub position: f32,
    pub beats_to_next: u32,
}

/// Last beat grid marker, carrying the tempo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TerminalMarker {
    /// Position in seconds
    pub position: f32,
    pub bpm: f32,
}

/// Either kind of beat grid marker, in stream order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BeatGridMarker {
    NonTerminal { position: f32, beats_to_next: u32 },
    Terminal { position: f32, bpm: f32 },
}

impl BeatGridMarker {
    pub fn position(&self) -> f32 {
        match *self {
            BeatGridMarker::NonTerminal { position, .. } => position,
            BeatGridMarker::Terminal { position, .. } => position,
        }
    }
}

/// Decoded beat grid
///
/// A complete grid has its terminal marker last. A grid cut short by
/// truncated data keeps the non-terminal markers read so far and has no
/// terminal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BeatGrid {
    pub non_terminal: Vec<NonTerminalMarker>,
    pub terminal: Option<TerminalMarker>,
}

impl BeatGrid {
    /// Build from markers in stream order. Only a trailing `Terminal` is
    /// kept as the terminal marker.
    pub fn from_markers(markers: Vec<BeatGridMarker>) -> Self {
        let mut grid = BeatGrid::default();
        let last = markers.len().saturating_sub(1);

        for (i, marker) in markers.into_iter().enumerate() {
            match marker {
                BeatGridMarker::NonTerminal { position, beats_to_next } => {
                    grid.non_terminal.push(NonTerminalMarker { position, beats_to_next });
                }
                BeatGridMarker::Terminal { position, bpm } if i == last => {
                    grid.terminal = Some(TerminalMarker { position, bpm });
                }
                BeatGridMarker::Terminal { .. } => {}
            }
        }

        grid
    }

    /// Markers in stream order (non-terminals, then the terminal)
    pub fn markers(&self) -> Vec<BeatGridMarker> {
        self.non_terminal
            .iter()
            .map(|m| BeatGridMarker::NonTerminal {
                position: m.position,
                beats_to_next: m.beats_to_next,
            })
            .chain(self.terminal.map(|t| BeatGridMarker::Terminal {
                position: t.position,
                bpm: t.bpm,
            }))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.non_terminal.len() + usize::from(self.terminal.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tempo from the terminal marker
    pub fn bpm(&self) -> Option<f32> {
        self.terminal.map(|t| t.bpm)
    }

    /// Position of the first marker in seconds, clamped to zero
    pub fn first_beat_secs(&self) -> Option<f32> {
        self.non_terminal
            .first()
            .map(|m| m.position)
            .or_else(|| self.terminal.map(|t| t.position))
            .map(|pos| pos.max(0.0))
    }
}
