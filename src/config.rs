//! Persisted packer configuration.
//!
//! The only setting is the compression level, stored as JSON so users can
//! edit it by hand:
//!
//! ```json
//! {
//!   "compression-level": 3,
//!   "compression-level-comment": "Integer between 0 (store) and 22 (ultra). ..."
//! }
//! ```
//!
//! Loading never fails: a missing or unreadable file yields the defaults.
//! Saving always writes the clamped level back, so the file exists (and
//! documents itself) after the first use.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::codec;
use crate::{Error, Result};

/// File name of the configuration, placed next to the executable.
pub const CONFIG_FILE_NAME: &str = "zstarc.json";

const LEVEL_KEY: &str = "compression-level";

/// Key spelling with U+2010 HYPHEN written by older builds.
const LEGACY_LEVEL_KEY: &str = "compression\u{2010}level";

/// Packer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    /// Compression level handed to the encoder.
    pub compression_level: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            compression_level: codec::default_level(),
        }
    }
}

#[derive(Serialize)]
struct ConfigFile {
    #[serde(rename = "compression-level")]
    compression_level: u32,
    #[serde(rename = "compression-level-comment")]
    comment: String,
}

impl Configuration {
    /// Loads the configuration at `path`, falling back to defaults.
    ///
    /// A missing file is silent; an unparsable file or a level that is not
    /// an unsigned integer logs a warning and keeps the default level.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("cannot read config '{}': {}", path.display(), e);
                return Self::default();
            }
        };

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("ignoring malformed config '{}': {}", path.display(), e);
                return Self::default();
            }
        };

        let level = value
            .get(LEVEL_KEY)
            .or_else(|| value.get(LEGACY_LEVEL_KEY))
            .and_then(Value::as_u64);
        match level {
            // Anything beyond u32 is clamped to the codec maximum anyway.
            Some(level) => Self {
                compression_level: u32::try_from(level).unwrap_or(u32::MAX),
            },
            None => {
                log::warn!("config '{}' has no usable {}", path.display(), LEVEL_KEY);
                Self::default()
            }
        }
    }

    /// Returns a copy with the level clamped to the codec's range.
    pub fn clamped(self) -> Self {
        Self {
            compression_level: self.compression_level.min(codec::max_level()),
        }
    }

    /// Writes the clamped configuration to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let max = codec::max_level();
        let file = ConfigFile {
            compression_level: self.clamped().compression_level,
            comment: format!(
                "Integer between 0 (store) and {} (ultra). Values >= 20 should be used with caution, as they require more memory.",
                max
            ),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::Config(format!("serialize: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| Error::Config(format!("write '{}': {}", path.display(), e)))?;
        log::debug!("saved config to '{}'", path.display());
        Ok(())
    }

    /// Loads, clamps and rewrites the configuration at `path`.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::load(path).clamped();
        config.save(path)?;
        Ok(config)
    }

    /// Default location: [`CONFIG_FILE_NAME`] in the executable's directory.
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .ok_or_else(|| Error::Config("executable has no parent directory".into()))?;
        Ok(dir.join(CONFIG_FILE_NAME))
    }
}
