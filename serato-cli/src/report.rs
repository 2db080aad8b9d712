//! Human readable and JSON output

use std::fmt::Write;
use std::path::Path;

use serde::Serialize;
use serato_core::{crate_display_name, BeatGrid, BeatGridMarker, CrateScan, HotCueEntry};

/// One decoded crate file, as printed
#[derive(Debug, Serialize)]
pub struct CrateReport {
    pub file: String,
    pub name: String,
    pub paths: Vec<String>,
    pub errors: Vec<String>,
}

impl CrateReport {
    /// `lookup` swaps the stored paths for host paths
    pub fn new(file: &Path, scan: &CrateScan, lookup: bool) -> Self {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let paths = if lookup {
            scan.paths
                .iter()
                .map(|p| p.lookup_path().to_string_lossy().into_owned())
                .collect()
        } else {
            scan.path_strings()
        };

        Self {
            file: file.display().to_string(),
            name: crate_display_name(&stem),
            paths,
            errors: scan.errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("{} ({} tracks)\n", self.name, self.paths.len());
        for path in &self.paths {
            let _ = writeln!(out, "  {}", path);
        }
        for error in &self.errors {
            let _ = writeln!(out, "  ! {}", error);
        }
        out
    }
}

/// `mm:ss.mmm`
pub fn format_position_ms(ms: u32) -> String {
    format!("{:02}:{:02}.{:03}", ms / 60_000, (ms / 1000) % 60, ms % 1000)
}

pub fn hot_cues_text(cues: &[HotCueEntry]) -> String {
    if cues.is_empty() {
        return "No hot cues\n".to_string();
    }

    let mut out = String::new();
    for cue in cues {
        let _ = writeln!(
            out,
            "  {:>2}. {}  {}  {}",
            u16::from(cue.index) + 1,
            format_position_ms(cue.position_ms),
            cue.color,
            cue.label
        );
    }
    out
}

pub fn beat_grid_text(grid: &BeatGrid) -> String {
    if grid.is_empty() {
        return "No beat grid\n".to_string();
    }

    let mut out = match grid.bpm() {
        Some(bpm) => format!("{:.2} BPM, {} markers\n", bpm, grid.len()),
        None => format!("Incomplete grid, {} markers\n", grid.len()),
    };
    for marker in grid.markers() {
        let _ = match marker {
            BeatGridMarker::NonTerminal { position, beats_to_next } => {
                writeln!(out, "  {:>10.3}s  {} beats", position, beats_to_next)
            }
            BeatGridMarker::Terminal { position, bpm } => {
                writeln!(out, "  {:>10.3}s  {:.2} BPM", position, bpm)
            }
        };
    }
    out
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serato_core::{decode_crate_paths, CueColor};

    #[test]
    fn test_position_format() {
        assert_eq!(format_position_ms(0), "00:00.000");
        assert_eq!(format_position_ms(61_234), "01:01.234");
        assert_eq!(format_position_ms(3_600_000), "60:00.000");
    }

    #[test]
    fn test_cue_lines() {
        let cues = vec![HotCueEntry {
            index: 0,
            position_ms: 1_500,
            color: CueColor::new(0xCC, 0, 0),
            label: "Intro".into(),
        }];
        assert_eq!(hot_cues_text(&cues), "   1. 00:01.500  #CC0000  Intro\n");
        assert_eq!(hot_cues_text(&[]), "No hot cues\n");
    }

    #[test]
    fn test_grid_text() {
        let grid = BeatGrid::from_markers(vec![
            BeatGridMarker::NonTerminal { position: 0.5, beats_to_next: 64 },
            BeatGridMarker::Terminal { position: 30.5, bpm: 128.0 },
        ]);
        let text = beat_grid_text(&grid);
        assert!(text.starts_with("128.00 BPM, 2 markers\n"));
        assert!(text.contains("64 beats"));
        assert_eq!(beat_grid_text(&BeatGrid::default()), "No beat grid\n");
    }

    #[test]
    fn test_crate_report() {
        let mut data = b"ptrk".to_vec();
        let path: Vec<u8> = "Music\\a.mp3".encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        data.extend_from_slice(&(path.len() as u32).to_be_bytes());
        data.extend_from_slice(&path);
        data.extend_from_slice(b"ptrk\x00");

        let scan = decode_crate_paths(&data);
        let report = CrateReport::new(Path::new("/crates/House%%Deep.crate"), &scan, false);
        assert_eq!(report.name, "House [Deep]");
        assert_eq!(report.paths, vec!["Music\\a.mp3"]);
        assert_eq!(report.errors.len(), 1);

        let text = report.to_text();
        assert!(text.starts_with("House [Deep] (1 tracks)\n"));
        assert!(text.contains("  ! Truncated data"));

        let json: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();
        assert_eq!(json["paths"][0], "Music\\a.mp3");
    }

    #[cfg(unix)]
    #[test]
    fn test_crate_report_lookup_paths() {
        let mut data = b"ptrk".to_vec();
        let path: Vec<u8> = "Music\\a.mp3".encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        data.extend_from_slice(&(path.len() as u32).to_be_bytes());
        data.extend_from_slice(&path);

        let report = CrateReport::new(Path::new("Techno.crate"), &decode_crate_paths(&data), true);
        assert_eq!(report.name, "Techno");
        assert_eq!(report.paths, vec!["/Music/a.mp3"]);
    }
}
