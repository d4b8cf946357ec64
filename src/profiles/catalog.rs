// src/profiles/catalog.rs

use std::sync::Arc;

use tracing::debug;

use super::{PlanId, ProfileConfig, ProfileMode};
use crate::constants::HIGH_PERFORMANCE_PLAN;
use crate::settings::SettingsStore;

/// Built-in definition for a mode, before any user override.
///
/// Gamer and Developer ship with real content; every other mode starts inert
/// so that applying it changes nothing beyond the power plan.
pub fn builtin_config(mode: ProfileMode) -> ProfileConfig {
    match mode {
        ProfileMode::Gamer => ProfileConfig {
            mode,
            services_to_stop: vec![
                "SysMain".to_string(),
                "WSearch".to_string(),
                "TabletInputService".to_string(),
                "PrintNotify".to_string(),
            ],
            disable_telemetry: true,
            disable_indexing: true,
            pause_windows_update: true,
            reduce_background_priority: true,
            auto_clean_ram: true,
            optimize_visual_effects: true,
            disable_network_throttling: true,
            power_plan_guid: PlanId::from(HIGH_PERFORMANCE_PLAN),
            ..ProfileConfig::default()
        },
        ProfileMode::Developer => ProfileConfig {
            mode,
            services_to_stop: vec!["WSearch".to_string(), "Spooler".to_string()],
            disable_telemetry: true,
            ..ProfileConfig::default()
        },
        ProfileMode::General | ProfileMode::Office | ProfileMode::Custom => {
            ProfileConfig::inert(mode)
        }
    }
}

/// Maps a mode to the configuration to apply, preferring a persisted user
/// override over the built-in definition.
pub struct ProfileCatalog {
    settings: Arc<SettingsStore>,
}

impl ProfileCatalog {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    /// Never fails: a missing or unreadable override table degrades to the
    /// built-in defaults. Overrides are re-read on every call so edits made
    /// while the tool runs are honored.
    pub fn resolve(&self, mode: ProfileMode) -> ProfileConfig {
        let settings = self.settings.load();
        match settings.performance_profiles.get(&mode) {
            Some(overridden) => {
                debug!("{:?} -> using persisted override", mode);
                let mut config = overridden.clone();
                config.mode = mode;
                config
            }
            None => builtin_config(mode),
        }
    }
}
