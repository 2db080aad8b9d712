//! CLI configuration

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serato_core::DecodeConfig;
use tracing::debug;

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputMode,
    /// JSON decode configuration; built-in defaults when absent
    pub decode_config: Option<PathBuf>,
    pub verbose: bool,
}

impl Config {
    pub fn load_decode_config(&self) -> Result<DecodeConfig> {
        load_decode_config(self.decode_config.as_deref())
    }
}

/// Read a [`DecodeConfig`] from a JSON file, or the defaults without one
pub fn load_decode_config(path: Option<&Path>) -> Result<DecodeConfig> {
    let Some(path) = path else {
        return Ok(DecodeConfig::default());
    };

    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {:?}", path))?;
    let config = DecodeConfig::from_json_str(&json)
        .with_context(|| format!("Invalid config {:?}", path))?;

    debug!(
        "Loaded {} hot cue and {} beat grid candidates from {:?}",
        config.hot_cue_tags.len(),
        config.beatgrid_tags.len(),
        path
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serato_core::LabelMode;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        assert_eq!(load_decode_config(None).unwrap(), DecodeConfig::default());
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"label_mode": "cut_at_first_nul"}}"#).unwrap();

        let config = Config {
            output: OutputMode::Text,
            decode_config: Some(file.path().to_path_buf()),
            verbose: false,
        };
        let decode = config.load_decode_config().unwrap();
        assert_eq!(decode.label_mode, LabelMode::CutAtFirstNul);
        assert_eq!(decode.hot_cue_tags, DecodeConfig::default().hot_cue_tags);
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_decode_config(Some(&dir.path().join("missing.json"))).is_err());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        let err = load_decode_config(Some(&bad)).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }
}
