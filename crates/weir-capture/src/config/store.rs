//! Load/save contract for settings persistence.

use super::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Storage boundary for settings. Hosting layers bring their own backing
/// store; the pipeline only calls through this trait.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings, SettingsError>;
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// JSON-file backed store, the default for the CLI host.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    /// Missing file means a fresh install: defaults, not an error. Loaded
    /// values are normalized before anyone sees them.
    fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            debug!(path = ?self.path, "settings file does not exist, using defaults");
            return Ok(Settings::default());
        }
        let json = fs::read_to_string(&self.path)?;
        let settings: Settings = serde_json::from_str(&json)?;
        Ok(settings.normalized())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)?;
        info!(path = ?self.path, "settings saved");
        Ok(())
    }
}
