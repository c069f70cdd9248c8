//! Tunables for the state core, loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::save_codec::DEFAULT_MAX_STRING_LEN;
use crate::version::SAVE_VERSION;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding save slots.
    pub save_root: PathBuf,
    /// Format version written by `GameState::save`.
    pub write_version: u32,
    /// Log script writes to variables flagged as unimplemented.
    pub warn_on_unknown_writes: bool,
    /// Longest save description accepted, in bytes.
    pub max_description_len: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            save_root: PathBuf::from("saves"),
            write_version: SAVE_VERSION,
            warn_on_unknown_writes: true,
            max_description_len: DEFAULT_MAX_STRING_LEN,
        }
    }
}

impl StateConfig {
    pub fn from_toml_str(raw: &str) -> StateResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|err| StateError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> StateResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> StateResult<String> {
        toml::to_string_pretty(self).map_err(|err| StateError::Config(err.to_string()))
    }

    pub fn validate(&self) -> StateResult<()> {
        if self.write_version > SAVE_VERSION {
            return Err(StateError::Config(format!(
                "write_version {} is above the newest supported version {SAVE_VERSION}",
                self.write_version
            )));
        }
        if self.max_description_len > u32::MAX as usize {
            return Err(StateError::Config(
                "max_description_len does not fit the save format".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
