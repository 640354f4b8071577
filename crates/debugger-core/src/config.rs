//! JSON host configuration: ROM path, peripheral modes and the key map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::peripherals::{KeyMatrix, KeyboardMode};
use crate::{ControllerConfig, DisplaySource};

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {}", path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid configuration JSON.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    /// A key map entry is outside the 8x8 scan matrix.
    #[error("key {key:?} maps to ({row}, {column}), outside the key matrix")]
    InvalidKeyBinding {
        /// Logical key name.
        key: String,
        /// Requested `KI` row.
        row: u8,
        /// Requested `KO` column.
        column: u8,
    },
}

/// Host-level settings for one debugging session.
///
/// `keymap` values are `[ki, ko]` pairs; `null` marks a key that resets the
/// core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// ROM image loaded by the engine.
    pub rom_path: PathBuf,
    /// Key delivery mode.
    pub keyboard_mode: KeyboardMode,
    /// Window used for display frames.
    pub display_source: DisplaySource,
    /// Stack base for the register panel instead of code word `0:0000`.
    pub stack_base_override: Option<u16>,
    /// Logical key name to `[ki, ko]`, or `null` for reset.
    pub keymap: BTreeMap<String, Option<[u8; 2]>>,
}

const DEFAULT_KEYMAP: &[(&str, Option<[u8; 2]>)] = &[
    ("f1", Some([7, 0])),
    ("f2", Some([7, 1])),
    ("up", Some([7, 2])),
    ("right", Some([7, 3])),
    ("f3", Some([7, 4])),
    ("home", Some([7, 4])),
    ("f4", None),
    ("f5", Some([6, 0])),
    ("f6", Some([6, 1])),
    ("left", Some([6, 2])),
    ("down", Some([6, 3])),
    ("f7", Some([6, 4])),
    ("parenleft", Some([3, 2])),
    ("parenright", Some([3, 3])),
    ("7", Some([2, 0])),
    ("8", Some([2, 1])),
    ("9", Some([2, 2])),
    ("backspace", Some([2, 3])),
    ("space", Some([2, 4])),
    ("tab", Some([2, 4])),
    ("4", Some([1, 0])),
    ("5", Some([1, 1])),
    ("6", Some([1, 2])),
    ("asterisk", Some([1, 3])),
    ("slash", Some([1, 4])),
    ("1", Some([0, 0])),
    ("2", Some([0, 1])),
    ("3", Some([0, 2])),
    ("plus", Some([0, 3])),
    ("minus", Some([0, 4])),
    ("0", Some([4, 6])),
    ("period", Some([3, 6])),
    ("e", Some([2, 6])),
    ("return", Some([0, 6])),
];

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            rom_path: PathBuf::from("rom.bin"),
            keyboard_mode: KeyboardMode::default(),
            display_source: DisplaySource::default(),
            stack_base_override: None,
            keymap: DEFAULT_KEYMAP
                .iter()
                .map(|(key, binding)| ((*key).to_string(), *binding))
                .collect(),
        }
    }
}

impl DebuggerConfig {
    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Json`].
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Serializes to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the validated key matrix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKeyBinding`] for rows or columns `>= 8`.
    pub fn key_matrix(&self) -> Result<KeyMatrix, ConfigError> {
        let mut keys = KeyMatrix::new();
        for (key, binding) in &self.keymap {
            match binding {
                None => keys.bind_reset(key.as_str()),
                Some([row, column]) => {
                    if !keys.bind(key.as_str(), *row, *column) {
                        return Err(ConfigError::InvalidKeyBinding {
                            key: key.clone(),
                            row: *row,
                            column: *column,
                        });
                    }
                }
            }
        }
        Ok(keys)
    }

    /// Controller-facing subset.
    #[must_use]
    pub const fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            keyboard_mode: self.keyboard_mode,
            stack_base_override: self.stack_base_override,
        }
    }
}
