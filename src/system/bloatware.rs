// src/system/bloatware.rs

//! Installed-application inventory from the uninstall registry views, plus a
//! launcher for the stored uninstall command. Runtimes, drivers and servicing
//! entries are filtered out so the listing only offers software that is safe
//! to remove.

use anyhow::Result;

/// An installed application discovered in the uninstall registry views.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InstalledApp {
    pub name: String,
    pub publisher: String,
    pub install_location: String,
    pub uninstall_command: String,
    /// Published by Microsoft or bundled with Windows, as opposed to
    /// third-party software.
    pub system_app: bool,
}

/// Name fragments that mark runtimes, drivers and Windows servicing entries.
const PROTECTED_NAME_FRAGMENTS: [&str; 8] = [
    "microsoft visual c++",
    ".net",
    "driver",
    "intel",
    "nvidia",
    "amd",
    "realtek",
    "update for windows",
];

/// True for entries that must never be offered for removal.
pub fn is_protected_component(name: &str) -> bool {
    if name.trim().is_empty() {
        return true;
    }
    let lowered = name.to_lowercase();
    PROTECTED_NAME_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

pub fn is_windows_publisher(publisher: &str) -> bool {
    let lowered = publisher.to_lowercase();
    lowered.contains("microsoft") || lowered.contains("windows")
}

/// Splits an uninstall command into program and arguments. Quoted program
/// paths keep their spaces.
pub fn split_command(command: &str) -> (String, String) {
    let command = command.trim();
    if let Some(rest) = command.strip_prefix('"') {
        if let Some(end) = rest.find('"') {
            return (rest[..end].to_string(), rest[end + 1..].trim().to_string());
        }
    }
    match command.split_once(' ') {
        Some((program, arguments)) => (program.to_string(), arguments.trim().to_string()),
        None => (command.to_string(), String::new()),
    }
}

#[cfg(windows)]
const UNINSTALL_VIEWS: [&str; 4] = [
    "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall",
    "HKEY_LOCAL_MACHINE\\SOFTWARE\\WOW6432Node\\Microsoft\\Windows\\CurrentVersion\\Uninstall",
    "HKEY_CURRENT_USER\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall",
    "HKEY_CURRENT_USER\\SOFTWARE\\WOW6432Node\\Microsoft\\Windows\\CurrentVersion\\Uninstall",
];

/// Applications safe to offer for removal, deduplicated by display name and
/// sorted. Entries flagged `SystemComponent` or lacking a display name or
/// uninstall command never appear.
#[cfg(windows)]
pub fn list_apps() -> Result<Vec<InstalledApp>> {
    use crate::utils::registry::{self, RegistryValue};

    let text = |path: &str, name: &str| -> Option<String> {
        match registry::read_value(path, name) {
            Ok(Some(RegistryValue::Text(value))) => Some(value),
            _ => None,
        }
    };

    let mut apps: Vec<InstalledApp> = Vec::new();
    for view in UNINSTALL_VIEWS {
        let subkeys = match registry::list_subkeys(view) {
            Ok(subkeys) => subkeys,
            Err(e) => {
                tracing::debug!("Skipping uninstall view {}: {:?}", view, e);
                continue;
            }
        };
        for subkey in subkeys {
            let path = format!("{}\\{}", view, subkey);
            let Some(name) = text(&path, "DisplayName") else {
                continue;
            };
            let Some(uninstall_command) = text(&path, "UninstallString") else {
                continue;
            };
            let system_component = matches!(
                registry::read_value(&path, "SystemComponent"),
                Ok(Some(RegistryValue::Dword(flag))) if flag != 0
            );
            if system_component || is_protected_component(&name) {
                continue;
            }
            // The 64-bit and WOW6432Node views repeat many products.
            if apps.iter().any(|app| app.name == name) {
                continue;
            }

            let publisher = text(&path, "Publisher").unwrap_or_default();
            let install_location = text(&path, "InstallLocation").unwrap_or_default();
            let system_app = is_windows_publisher(&publisher);
            apps.push(InstalledApp {
                name,
                publisher,
                install_location,
                uninstall_command,
                system_app,
            });
        }
    }

    apps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(apps)
}

/// Launches the stored uninstall command elevated and waits for it to finish.
#[cfg(windows)]
pub fn uninstall_app(name: &str) -> Result<()> {
    use crate::utils::windows::run_elevated;

    let apps = list_apps()?;
    let Some(app) = apps.iter().find(|app| app.name.eq_ignore_ascii_case(name)) else {
        anyhow::bail!("No installed application named '{}'", name);
    };

    let (program, arguments) = split_command(&app.uninstall_command);
    tracing::info!("Uninstalling '{}' via '{}'", app.name, app.uninstall_command);
    let code = run_elevated(&program, &arguments)?;
    if code != 0 {
        anyhow::bail!("Uninstaller for '{}' exited with {}", app.name, code);
    }
    Ok(())
}

#[cfg(not(windows))]
pub fn list_apps() -> Result<Vec<InstalledApp>> {
    anyhow::bail!("the application inventory is only available on Windows")
}

#[cfg(not(windows))]
pub fn uninstall_app(_name: &str) -> Result<()> {
    anyhow::bail!("the application inventory is only available on Windows")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_and_driver_entries_are_protected() {
        assert!(is_protected_component(
            "Microsoft Visual C++ 2015-2022 Redistributable (x64)"
        ));
        assert!(is_protected_component("Intel(R) Chipset Device Software"));
        assert!(is_protected_component("NVIDIA Graphics Driver 551.23"));
        assert!(is_protected_component("Realtek High Definition Audio"));
        assert!(is_protected_component(""));
        assert!(!is_protected_component("Contoso Toolbar"));
    }

    #[test]
    fn publisher_heuristic_flags_microsoft() {
        assert!(is_windows_publisher("Microsoft Corporation"));
        assert!(is_windows_publisher("Windows Team"));
        assert!(!is_windows_publisher("Contoso Ltd"));
        assert!(!is_windows_publisher(""));
    }

    #[test]
    fn quoted_uninstall_commands_keep_their_path() {
        let (program, arguments) =
            split_command("\"C:\\Program Files\\Contoso\\unins000.exe\" /SILENT");
        assert_eq!(program, "C:\\Program Files\\Contoso\\unins000.exe");
        assert_eq!(arguments, "/SILENT");
    }

    #[test]
    fn msiexec_commands_split_on_the_first_space() {
        let (program, arguments) =
            split_command("MsiExec.exe /X{1E3C8A1F-0000-0000-0000-000000000000}");
        assert_eq!(program, "MsiExec.exe");
        assert_eq!(arguments, "/X{1E3C8A1F-0000-0000-0000-000000000000}");
    }

    #[test]
    fn bare_commands_have_no_arguments() {
        let (program, arguments) = split_command("C:\\Tools\\cleanup.exe");
        assert_eq!(program, "C:\\Tools\\cleanup.exe");
        assert_eq!(arguments, "");
    }
}
