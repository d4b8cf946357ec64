// src/constants.rs

use std::path::PathBuf;

use once_cell::sync::Lazy;

/// Directory under the local app-data root that holds all persisted state.
pub const APP_DIR_NAME: &str = "perfmode";

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

/// Default location for `settings.json` and `snapshot.json`.
pub static DEFAULT_DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
});

// Stock power plan GUIDs, as shown by `powercfg /list`.
pub const BALANCED_PLAN: &str = "381b4222-f694-41f0-9685-ff5bb260df2e";
pub const HIGH_PERFORMANCE_PLAN: &str = "8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c";

/// Windows Update. Stopping it is what "pause updates" means here.
pub const UPDATE_SERVICE: &str = "wuauserv";

/// Windows Search indexer.
pub const INDEXING_SERVICE: &str = "WSearch";

/// Connected User Experiences and the WAP push message service.
pub const TELEMETRY_SERVICES: [&str; 2] = ["DiagTrack", "dmwappushservice"];

pub const VISUAL_EFFECTS_KEY: &str =
    "HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\VisualEffects";
pub const VISUAL_EFFECTS_VALUE: &str = "VisualFXSetting";
/// 2 = adjust for best performance, 1 = let Windows choose.
pub const VISUAL_EFFECTS_PERFORMANCE: u32 = 2;
pub const VISUAL_EFFECTS_DEFAULT: u32 = 1;

pub const NETWORK_THROTTLING_KEY: &str =
    "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile";
pub const NETWORK_THROTTLING_VALUE: &str = "NetworkThrottlingIndex";
/// 0xFFFFFFFF disables the multimedia network throttling mechanism.
pub const NETWORK_THROTTLING_DISABLED: u32 = 0xFFFF_FFFF;
pub const NETWORK_THROTTLING_DEFAULT: u32 = 10;

/// EnableLUA, 1 when UAC is on.
pub const UAC_POLICY_KEY: &str =
    "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Policies\\System";
pub const UAC_POLICY_VALUE: &str = "EnableLUA";

/// How often the profile watcher polls the process list.
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 15;
