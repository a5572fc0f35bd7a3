//! Module for accessing, saving, and loading configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::{cache_dir, config_dir};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::APP_NAME;

const DEFAULT_MAX_CONCURRENT_PLAYBACKS: usize = 16;

/// Configuration structure for the application. Only values that differ
/// from the defaults are written back to disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding the bundled clips. Falls back to the directory
    /// shipped next to the binary when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assets_dir: Option<PathBuf>,

    /// Directory new recordings are written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recordings_dir: Option<PathBuf>,

    /// When false every permission request is answered with a denial.
    #[serde(
        default = "default_allow_microphone",
        skip_serializing_if = "Config::is_default_allow_microphone"
    )]
    allow_microphone: bool,

    /// Upper bound on clips playing at the same time.
    #[serde(
        default = "default_max_concurrent_playbacks",
        skip_serializing_if = "Config::is_default_max_concurrent_playbacks"
    )]
    max_concurrent_playbacks: usize,

    /// Show a desktop notification whenever the status line changes.
    #[serde(default, skip_serializing_if = "Config::is_default_notify_status")]
    notify_status: bool,

    /// Toggle hotkey, e.g. "meta+shift+r". Parsed by the app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hotkey: Option<String>,
}

fn default_allow_microphone() -> bool {
    true
}

fn default_max_concurrent_playbacks() -> usize {
    DEFAULT_MAX_CONCURRENT_PLAYBACKS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: None,
            recordings_dir: None,
            allow_microphone: default_allow_microphone(),
            max_concurrent_playbacks: default_max_concurrent_playbacks(),
            notify_status: false,
            hotkey: None,
        }
    }
}

impl Config {
    fn is_default_allow_microphone(allow: &bool) -> bool {
        allow == &Self::default().allow_microphone
    }

    fn is_default_max_concurrent_playbacks(max: &usize) -> bool {
        *max == DEFAULT_MAX_CONCURRENT_PLAYBACKS
    }

    fn is_default_notify_status(notify: &bool) -> bool {
        notify == &Self::default().notify_status
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }

    pub fn set_assets_dir(&mut self, dir: impl Into<PathBuf>) {
        self.assets_dir = Some(dir.into());
    }

    /// Directory for new recordings, defaulting to the user cache directory.
    pub fn recordings_dir(&self) -> PathBuf {
        match &self.recordings_dir {
            Some(dir) => dir.clone(),
            None => cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_NAME)
                .join("recordings"),
        }
    }

    pub fn set_recordings_dir(&mut self, dir: impl Into<PathBuf>) {
        self.recordings_dir = Some(dir.into());
    }

    pub fn allow_microphone(&self) -> bool {
        self.allow_microphone
    }

    pub fn set_allow_microphone(&mut self, allow: bool) {
        self.allow_microphone = allow;
    }

    /// Never less than one, so at least a single clip can always play.
    pub fn max_concurrent_playbacks(&self) -> usize {
        self.max_concurrent_playbacks.max(1)
    }

    pub fn set_max_concurrent_playbacks(&mut self, max: usize) {
        self.max_concurrent_playbacks = max;
    }

    pub fn notify_status(&self) -> bool {
        self.notify_status
    }

    pub fn hotkey(&self) -> Option<&str> {
        self.hotkey.as_deref()
    }

    pub fn set_hotkey(&mut self, hotkey: &str) {
        self.hotkey = Some(hotkey.to_owned());
    }
}

/// Manages loading and saving the configuration file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new `ConfigManager` rooted at the platform config directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a `ConfigManager` that keeps its file in `dir`.
    pub fn with_config_dir<P: AsRef<Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// `<config dir>/soundboard/soundboard.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration, or the defaults when no file exists yet.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            info!(path = ?self.config_path, "No config file, using defaults");
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if !config.allow_microphone() {
            warn!("Microphone access is disabled in the config; recording will be denied");
        }

        Ok(config)
    }

    /// Writes the configuration, creating the directory if needed.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_default_config() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());
        let config = manager.load().unwrap();
        assert_eq!(config, Config::default());
        assert!(config.allow_microphone());
        assert_eq!(config.max_concurrent_playbacks(), 16);
        assert!(!config.notify_status());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());

        let mut config = Config::default();
        config.set_allow_microphone(false);
        config.set_recordings_dir(temp.path().join("recs"));
        config.set_hotkey("ctrl+shift+r");
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.recordings_dir(), temp.path().join("recs"));
        assert_eq!(loaded.hotkey(), Some("ctrl+shift+r"));
    }

    #[test]
    fn test_default_config_serializes_empty() {
        let serialized = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(serialized.trim().is_empty(), "got {serialized:?}");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());
        fs::write(manager.config_path(), "max_concurrent_playbacks = 4\n").unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.max_concurrent_playbacks(), 4);
        assert!(config.allow_microphone());
        assert!(config.assets_dir().is_none());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());
        fs::write(manager.config_path(), "allow_microphone = \"sometimes\"").unwrap();

        assert!(manager.load().is_err());
    }

    #[test]
    fn test_zero_playbacks_clamped() {
        let mut config = Config::default();
        config.set_max_concurrent_playbacks(0);
        assert_eq!(config.max_concurrent_playbacks(), 1);
    }

    #[test]
    fn test_save_creates_config_file() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path().join("nested"));
        manager.save(&Config::default()).unwrap();
        assert!(manager.config_path().exists());
    }
}
