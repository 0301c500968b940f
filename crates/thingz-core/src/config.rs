use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reminders::ReminderPolicy;

/// Application configuration
///
/// Read from `<config dir>/thingz/config.toml`. Every field has a default,
/// so a missing file or a partial one is fine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("thingz");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite database file. Defaults to `<data dir>/thingz/thingz.db`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn db_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("thingz");
        Ok(data_dir.join("thingz.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Local hour (0-23) for seasonal clothing reminders
    #[serde(default = "default_seasonal_hour")]
    pub seasonal_hour: u32,

    /// Fixed offset from UTC in minutes; the system zone when unset
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

fn default_true() -> bool {
    true
}

fn default_seasonal_hour() -> u32 {
    9
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seasonal_hour: default_seasonal_hour(),
            utc_offset_minutes: None,
        }
    }
}

impl ReminderConfig {
    pub fn policy(&self) -> crate::Result<ReminderPolicy> {
        if self.seasonal_hour > 23 {
            return Err(crate::Error::ConfigError(format!(
                "seasonal_hour must be 0-23, got {}",
                self.seasonal_hour
            )));
        }

        let utc_offset = match self.utc_offset_minutes {
            Some(minutes) => FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
                crate::Error::ConfigError(format!("Invalid UTC offset: {} minutes", minutes))
            })?,
            None => Local::now().offset().fix(),
        };

        Ok(ReminderPolicy {
            enabled: self.enabled,
            seasonal_hour: self.seasonal_hour,
            utc_offset,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long a saved login stays valid
    #[serde(default = "default_session_days")]
    pub session_days: u32,
}

fn default_api_url() -> String {
    thingz_api::DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    thingz_api::DEFAULT_TIMEOUT_SECS
}

fn default_session_days() -> u32 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            session_days: default_session_days(),
        }
    }
}

impl AuthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
