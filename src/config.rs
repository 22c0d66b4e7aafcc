//! Runtime configuration.
//!
//! Settings can come from a JSON file; command-line flags override them.
//!
//! ```json
//! { "endian": "big", "max_steps": 100000, "trace": true }
//! ```

use crate::cpu::Endian;
use serde::{Serialize, Deserialize};
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Emulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Byte order of program files.
    pub endian: Endian,
    /// Upper bound on steps for a `run`. `None` runs until the program ends.
    pub max_steps: Option<u64>,
    /// Print each instruction as it executes.
    pub trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endian: Endian::Little,
            max_steps: None,
            trace: false,
        }
    }
}

impl Config {
    /// Read a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            ConfigError::Parse {
                path: path.display().to_string(),
                source,
            }
        })?;
        log::debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

/// Errors that can occur while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
