//! Profile file loading.
//!
//! The profile file maps an environment name to connection defaults:
//!
//! ```yaml
//! default:
//!   address: "127.0.0.1:16260"
//!   password: "password"
//!   log: "rcon-default.log"
//!   type: ""
//! rust:
//!   address: "127.0.0.1:28016"
//!   password: "password"
//!   type: "web"
//! ```
//!
//! YAML is the default format; a `.json` extension selects JSON.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// File read when `--cfg` is not given.
pub const DEFAULT_CONFIG_NAME: &str = "rcon.yaml";

/// Profile used when `--env` is not given.
pub const DEFAULT_CONFIG_ENV: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse configuration file {}: {source}", path.display())]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse configuration file {}: {source}", path.display())]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Connection defaults for one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub address: String,
    pub password: String,
    pub log: String,
    #[serde(rename = "type")]
    pub protocol: String,
}

/// All profiles keyed by environment name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub profiles: HashMap<String, Profile>,
}

impl Config {
    pub fn profile(&self, env: &str) -> Option<&Profile> {
        self.profiles.get(env)
    }

    pub fn from_yaml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not a map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(path: &Path, content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::ParseJson {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Where profiles come from.
///
/// The credential resolver only touches the source when the command line
/// did not already supply both address and password.
pub trait ConfigSource {
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Profiles stored in a YAML or JSON file.
#[derive(Debug, Clone, Default)]
pub struct FileConfigSource {
    path: Option<PathBuf>,
}

impl FileConfigSource {
    /// `None` reads [`DEFAULT_CONFIG_NAME`] from the working directory, and
    /// tolerates it being absent.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<Config, ConfigError> {
        let (path, explicit) = match &self.path {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_NAME), false),
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if !explicit && e.kind() == io::ErrorKind::NotFound => {
                debug!("Config file not found at {:?}, using empty configuration", path);
                return Ok(Config::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        debug!("Loading profiles from {:?}", path);
        if is_json {
            Config::from_json(&path, &content)
        } else {
            Config::from_yaml(&path, &content)
        }
    }
}
