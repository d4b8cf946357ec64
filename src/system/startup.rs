// src/system/startup.rs

//! Logon autostart entries: the Run/RunOnce registry keys plus the launchable
//! files in the Startup folders. Disabling a registry entry parks its command
//! under a sibling backup key instead of deleting it, so enabling is always
//! an exact inverse. Folder items are list-only.

use std::path::Path;

use anyhow::Result;

/// File extensions the shell launches from a Startup folder.
const STARTUP_EXTENSIONS: [&str; 5] = ["exe", "lnk", "bat", "vbs", "cmd"];

/// Places that launch programs at logon.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StartupLocation {
    MachineRun,
    MachineRunOnce,
    UserRun,
    UserRunOnce,
    UserStartupFolder,
    CommonStartupFolder,
}

impl StartupLocation {
    /// The registry locations, the only kind with a live/backup key pair.
    pub const REGISTRY: [StartupLocation; 4] = [
        StartupLocation::MachineRun,
        StartupLocation::MachineRunOnce,
        StartupLocation::UserRun,
        StartupLocation::UserRunOnce,
    ];

    fn registry_parts(self) -> Option<(&'static str, &'static str)> {
        match self {
            StartupLocation::MachineRun => Some(("HKEY_LOCAL_MACHINE", "Run")),
            StartupLocation::MachineRunOnce => Some(("HKEY_LOCAL_MACHINE", "RunOnce")),
            StartupLocation::UserRun => Some(("HKEY_CURRENT_USER", "Run")),
            StartupLocation::UserRunOnce => Some(("HKEY_CURRENT_USER", "RunOnce")),
            StartupLocation::UserStartupFolder | StartupLocation::CommonStartupFolder => None,
        }
    }

    /// The live key entries launch from. Folder locations have no key.
    pub fn run_path(self) -> Option<String> {
        let (hive, key) = self.registry_parts()?;
        Some(format!(
            "{}\\Software\\Microsoft\\Windows\\CurrentVersion\\{}",
            hive, key
        ))
    }

    /// Where a disabled entry is parked. Same hive as the live key, so
    /// enable and disable need the same permissions.
    pub fn backup_path(self) -> Option<String> {
        let (hive, key) = self.registry_parts()?;
        Some(format!("{}\\Software\\Perfmode\\StartupBackup\\{}", hive, key))
    }

    pub fn label(self) -> &'static str {
        match self {
            StartupLocation::MachineRun => "HKLM Run",
            StartupLocation::MachineRunOnce => "HKLM RunOnce",
            StartupLocation::UserRun => "HKCU Run",
            StartupLocation::UserRunOnce => "HKCU RunOnce",
            StartupLocation::UserStartupFolder => "Startup folder",
            StartupLocation::CommonStartupFolder => "Common Startup",
        }
    }
}

/// One logon autostart entry. For folder items the command is the file path.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StartupEntry {
    pub name: String,
    pub command: String,
    pub location: StartupLocation,
    pub enabled: bool,
}

fn is_launchable(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(extension) => STARTUP_EXTENSIONS
            .iter()
            .any(|known| extension.eq_ignore_ascii_case(known)),
        None => false,
    }
}

/// Collects the launchable files of one Startup folder. A folder that does
/// not exist yields nothing; one that cannot be read is logged and skipped.
pub fn collect_folder_entries(
    folder: &Path,
    location: StartupLocation,
    entries: &mut Vec<StartupEntry>,
) {
    let reader = match std::fs::read_dir(folder) {
        Ok(reader) => reader,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            tracing::warn!("could not read startup folder {}: {}", folder.display(), e);
            return;
        }
    };
    for file in reader.flatten() {
        let path = file.path();
        if !path.is_file() || !is_launchable(&path) {
            continue;
        }
        let Some(stem) = path.file_stem() else { continue };
        entries.push(StartupEntry {
            name: stem.to_string_lossy().into_owned(),
            command: path.display().to_string(),
            location,
            enabled: true,
        });
    }
}

/// Resolves a known folder to its filesystem path.
#[cfg(windows)]
fn known_folder(id: &windows::core::GUID) -> Option<std::path::PathBuf> {
    use windows::Win32::System::Com::CoTaskMemFree;
    use windows::Win32::UI::Shell::{SHGetKnownFolderPath, KF_FLAG_DEFAULT};

    unsafe {
        let path = SHGetKnownFolderPath(id, KF_FLAG_DEFAULT, None).ok()?;
        let folder = path.to_string().ok().map(std::path::PathBuf::from);
        CoTaskMemFree(Some(path.as_ptr() as *const _));
        folder
    }
}

/// All entries across the registry locations (live and parked alike) and the
/// per-user and all-users Startup folders.
#[cfg(windows)]
pub fn list_entries() -> Result<Vec<StartupEntry>> {
    use windows::Win32::UI::Shell::{FOLDERID_CommonStartup, FOLDERID_Startup};

    use crate::utils::registry::{self, RegistryValue};

    let mut entries = Vec::new();
    for location in StartupLocation::REGISTRY {
        let (Some(run), Some(backup)) = (location.run_path(), location.backup_path()) else {
            continue;
        };
        for (path, enabled) in [(run, true), (backup, false)] {
            for (name, value) in registry::list_values(&path)? {
                // Only string values are launch commands.
                if let RegistryValue::Text(command) = value {
                    entries.push(StartupEntry {
                        name,
                        command,
                        location,
                        enabled,
                    });
                }
            }
        }
    }

    for (id, location) in [
        (&FOLDERID_Startup, StartupLocation::UserStartupFolder),
        (&FOLDERID_CommonStartup, StartupLocation::CommonStartupFolder),
    ] {
        if let Some(folder) = known_folder(id) {
            collect_folder_entries(&folder, location, &mut entries);
        }
    }
    Ok(entries)
}

/// Parks a live registry entry under the backup key so it stops launching at
/// logon. Returns where the entry was found.
#[cfg(windows)]
pub fn disable_entry(name: &str) -> Result<StartupLocation> {
    move_entry(name, Direction::Disable)
}

/// Moves a parked registry entry back to its live key.
#[cfg(windows)]
pub fn enable_entry(name: &str) -> Result<StartupLocation> {
    move_entry(name, Direction::Enable)
}

#[cfg(windows)]
#[derive(Clone, Copy)]
enum Direction {
    Disable,
    Enable,
}

#[cfg(windows)]
fn move_entry(name: &str, direction: Direction) -> Result<StartupLocation> {
    use crate::utils::registry::{self, RegistryValue};

    for location in StartupLocation::REGISTRY {
        let (Some(run), Some(backup)) = (location.run_path(), location.backup_path()) else {
            continue;
        };
        let (from, to) = match direction {
            Direction::Disable => (run, backup),
            Direction::Enable => (backup, run),
        };
        for (value_name, value) in registry::list_values(&from)? {
            if !value_name.eq_ignore_ascii_case(name) {
                continue;
            }
            if let RegistryValue::Text(_) = value {
                // Copy before delete, so an interrupted move can only leave a
                // duplicate, never lose the command.
                registry::set_value(&to, &value_name, &value)?;
                registry::delete_value(&from, &value_name)?;
                tracing::info!("Moved startup entry '{}' from {} to {}", value_name, from, to);
                return Ok(location);
            }
        }
    }

    match direction {
        Direction::Disable => {
            anyhow::bail!("No enabled startup entry named '{}' under the Run keys", name)
        }
        Direction::Enable => {
            anyhow::bail!("No disabled startup entry named '{}' under the backup keys", name)
        }
    }
}

#[cfg(not(windows))]
pub fn list_entries() -> Result<Vec<StartupEntry>> {
    anyhow::bail!("startup entries are only available on Windows")
}

#[cfg(not(windows))]
pub fn disable_entry(_name: &str) -> Result<StartupLocation> {
    anyhow::bail!("startup entries are only available on Windows")
}

#[cfg(not(windows))]
pub fn enable_entry(_name: &str) -> Result<StartupLocation> {
    anyhow::bail!("startup entries are only available on Windows")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn locations_map_to_the_documented_keys() {
        assert_eq!(
            StartupLocation::MachineRun.run_path().as_deref(),
            Some("HKEY_LOCAL_MACHINE\\Software\\Microsoft\\Windows\\CurrentVersion\\Run")
        );
        assert_eq!(
            StartupLocation::UserRunOnce.run_path().as_deref(),
            Some("HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\RunOnce")
        );
        assert_eq!(StartupLocation::UserStartupFolder.run_path(), None);
        assert_eq!(StartupLocation::CommonStartupFolder.backup_path(), None);
    }

    #[test]
    fn backup_keys_stay_in_the_same_hive() {
        for location in StartupLocation::REGISTRY {
            let run = location.run_path().unwrap();
            let backup = location.backup_path().unwrap();
            assert_eq!(run.split('\\').next(), backup.split('\\').next());
            assert!(backup.contains("StartupBackup"));
            assert_ne!(run, backup);
        }
    }

    #[test]
    fn folder_scan_keeps_only_launchable_files() {
        let dir = TempDir::new().unwrap();
        for file in ["game.exe", "sync tool.lnk", "JOB.CMD", "notes.txt", "setup.msi"] {
            std::fs::write(dir.path().join(file), b"x").unwrap();
        }
        // A directory with a launchable-looking name is not a startup item.
        std::fs::create_dir(dir.path().join("nested.exe")).unwrap();

        let mut entries = Vec::new();
        collect_folder_entries(dir.path(), StartupLocation::UserStartupFolder, &mut entries);

        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["JOB", "game", "sync tool"]);
        assert!(entries.iter().all(|e| e.enabled));
        assert!(entries
            .iter()
            .all(|e| e.location == StartupLocation::UserStartupFolder));
        assert!(entries.iter().any(|e| e.command.ends_with("game.exe")));
    }

    #[test]
    fn a_missing_startup_folder_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let mut entries = Vec::new();
        collect_folder_entries(
            &dir.path().join("no-such-folder"),
            StartupLocation::CommonStartupFolder,
            &mut entries,
        );
        assert!(entries.is_empty());
    }

    #[cfg(windows)]
    #[test]
    fn listing_startup_entries_succeeds() {
        let entries = list_entries().expect("Failed to list startup entries");
        for entry in entries {
            assert!(!entry.name.is_empty());
        }
    }
}
