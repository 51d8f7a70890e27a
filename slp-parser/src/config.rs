use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SlpError};
use crate::reader::SlpSource;

/// Frames a combo may go without the defender being hit, grabbed, teching, downed or dying
/// before it is considered over.
pub const COMBO_STRING_RESET_FRAMES: u32 = 45;

/// Frames a conversion may go with the defender back in control before it is considered over.
pub const PUNISH_RESET_FRAMES: u32 = 45;

/// Tunables for the stat computers. The defaults are the values that have been tuned
/// against real netplay and tournament replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsConfig {
    pub combo_reset_frames: u32,
    pub punish_reset_frames: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            combo_reset_frames: COMBO_STRING_RESET_FRAMES,
            punish_reset_frames: PUNISH_RESET_FRAMES,
        }
    }
}

impl StatsConfig {
    /// Reads a JSON config file. Missing fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path).map_err(|e| SlpError::ConfigIo(format!("{}: {e}", path.display())))?;
        serde_json::from_str::<StatsConfig>(&txt).map_err(|e| SlpError::ConfigParse(format!("{}: {e}", path.display())))
    }
}

/// The JSON form of a replay source, tagged by `source`.
///
/// ```json
/// { "source": "file", "path": "Game_20230101T120000.slp" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum SourceConfig {
    File { path: PathBuf },
    Buffer { bytes: Vec<u8> },
}

impl SourceConfig {
    pub fn from_json(txt: &str) -> Result<Self> {
        serde_json::from_str(txt).map_err(|e| SlpError::InvalidSource(e.to_string()))
    }
}

impl From<SourceConfig> for SlpSource {
    fn from(config: SourceConfig) -> Self {
        match config {
            SourceConfig::File { path } => SlpSource::File(path),
            SourceConfig::Buffer { bytes } => SlpSource::Buffer(bytes),
        }
    }
}
