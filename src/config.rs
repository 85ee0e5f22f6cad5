//! Configuration loading and management
//!
//! Handles parsing of `studytrack.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::storage::{validate_key, TASKS_KEY, THEME_KEY};
use crate::theme::Theme;

/// File name looked up in the config directory
pub const CONFIG_FILE: &str = "studytrack.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Timer settings
    #[serde(default)]
    pub timer: TimerConfig,

    /// Theme settings
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory; the platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Key holding the task list
    #[serde(default = "default_tasks_key")]
    pub tasks_key: String,

    /// Key holding the theme preference
    #[serde(default = "default_theme_key")]
    pub theme_key: String,

    /// How long a writer waits for the data lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_tasks_key() -> String {
    TASKS_KEY.to_string()
}

fn default_theme_key() -> String {
    THEME_KEY.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            tasks_key: default_tasks_key(),
            theme_key: default_theme_key(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Length of one logical second, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 {
    1000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

impl TimerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Theme used on first run when the terminal gives no hint
    #[serde(default = "default_ambient")]
    pub ambient: Theme,
}

fn default_ambient() -> Theme {
    Theme::Light
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            ambient: default_ambient(),
        }
    }
}

impl Config {
    /// Load configuration from a `studytrack.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `studytrack.toml` from `dir`, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_key(&self.storage.tasks_key).map_err(|_| {
            Error::InvalidConfig(format!(
                "storage.tasks_key: invalid key '{}'",
                self.storage.tasks_key
            ))
        })?;
        validate_key(&self.storage.theme_key).map_err(|_| {
            Error::InvalidConfig(format!(
                "storage.theme_key: invalid key '{}'",
                self.storage.theme_key
            ))
        })?;
        if self.storage.tasks_key == self.storage.theme_key {
            return Err(Error::InvalidConfig(
                "storage.tasks_key and storage.theme_key must differ".to_string(),
            ));
        }
        if self.timer.tick_ms == 0 {
            return Err(Error::InvalidConfig(
                "timer.tick_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
