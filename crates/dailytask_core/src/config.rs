//! Tracker configuration persisted as TOML.
//!
//! # Invariants
//! - A missing file means "all defaults"; missing keys take their defaults.
//! - `alert_hour` is always within `0..=23` after a successful load.
//! - `log_dir` is absolute so it can be handed to [`crate::init_logging`].

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "dailytask";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "tasks.sqlite3";

/// Local hour of the daily reminder when nothing is configured (midnight).
pub const DEFAULT_ALERT_HOUR: u8 = 0;

/// Runtime configuration for the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Local hour (0-23) at which the reminder cycle fires.
    pub alert_hour: u8,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            alert_hour: DEFAULT_ALERT_HOUR,
            db_path: data_dir.join(DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: data_dir.join("logs"),
        }
    }
}

/// Errors from loading or saving configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Serialize(toml::ser::Error),
    InvalidAlertHour(u8),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot access config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
            Self::Serialize(err) => write!(f, "cannot serialize config: {err}"),
            Self::InvalidAlertHour(hour) => {
                write!(f, "alert_hour {hour} is out of range; expected 0..=23")
            }
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::InvalidAlertHour(_) | Self::RelativeLogDir(_) => None,
        }
    }
}

impl TrackerConfig {
    /// Loads and validates config from `path`.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads config from `path`, falling back to defaults when it is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Writes config as pretty TOML, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alert_hour > 23 {
            return Err(ConfigError::InvalidAlertHour(self.alert_hour));
        }
        if !self.log_dir.is_absolute() {
            return Err(ConfigError::RelativeLogDir(self.log_dir.clone()));
        }
        Ok(())
    }

    /// `<config_dir>/dailytask/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}
