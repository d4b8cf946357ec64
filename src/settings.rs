// src/settings.rs

use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_WATCH_INTERVAL_SECS, SETTINGS_FILE_NAME};
use crate::errors::EngineError;
use crate::profiles::{ProfileConfig, ProfileMode};

/// User-editable configuration. The baseline snapshot is deliberately not in
/// here; it has its own record so settings writes can never touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Per-mode overrides of the built-in profiles.
    pub performance_profiles: IndexMap<ProfileMode, ProfileConfig>,
    /// Poll interval of the profile watcher, in seconds.
    pub watch_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            performance_profiles: IndexMap::new(),
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
        }
    }
}

/// Reads and writes `settings.json`.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn at_default_location() -> Self {
        Self::new(DEFAULT_DATA_DIR.join(SETTINGS_FILE_NAME))
    }

    /// Loads settings, falling back to defaults when the file is missing or
    /// unreadable. Settings are user-editable JSON, so a broken file must not
    /// take the tool down.
    pub fn load(&self) -> Settings {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("ignoring malformed {}: {}", self.path.display(), e);
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no settings file yet, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!("could not read {}: {}", self.path.display(), e);
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Persistence(format!("creating {}: {}", parent.display(), e))
            })?;
        }
        let raw = serde_json::to_string_pretty(settings)
            .map_err(|e| EngineError::Persistence(format!("encoding settings: {}", e)))?;
        fs::write(&self.path, raw).map_err(|e| {
            EngineError::Persistence(format!("writing {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
