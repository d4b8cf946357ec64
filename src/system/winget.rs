// src/system/winget.rs

//! `winget upgrade` integration. The listing is a fixed-width table whose
//! column positions come from the header line, so the parser slices every
//! data row at the offsets the header declares. Localized winget builds
//! translate the captions, which is why each column has a fallback name.

use anyhow::Result;

/// One row of the `winget upgrade` table.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UpgradablePackage {
    pub name: String,
    pub id: String,
    pub current_version: String,
    pub available_version: String,
    pub source: String,
}

/// Character offsets of the column starts, taken from the header line.
#[derive(Clone, Copy, Debug)]
struct Columns {
    id: usize,
    version: usize,
    available: usize,
    source: usize,
}

/// Char-index `find`, so offsets line up with winget's column padding even
/// when captions or names carry non-ASCII characters.
fn index_of(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    haystack
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
}

fn header_columns(header: &[char]) -> Option<Columns> {
    let first = |names: &[&str]| names.iter().find_map(|name| index_of(header, name));
    Some(Columns {
        id: first(&["Id"])?,
        version: first(&["Version", "Versión"])?,
        available: first(&["Available", "Disponible"])?,
        source: first(&["Source", "Origen"])?,
    })
}

fn column(row: &[char], start: usize, end: usize) -> String {
    let start = start.min(row.len());
    let end = end.min(row.len()).max(start);
    row[start..end].iter().collect::<String>().trim().to_string()
}

/// Parses the table printed by `winget upgrade`. Data rows begin after the
/// `---` divider; rows too short to carry an id, like the "n upgrades
/// available." footer, are skipped.
pub fn parse_upgrade_listing(output: &str) -> Vec<UpgradablePackage> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();

    let Some(header) = lines
        .iter()
        .find(|l| l.contains("Id") && (l.contains("Version") || l.contains("Versión")))
    else {
        return Vec::new();
    };
    let header: Vec<char> = header.chars().collect();
    let Some(columns) = header_columns(&header) else {
        return Vec::new();
    };

    let mut packages = Vec::new();
    let mut header_passed = false;
    for line in &lines {
        if !header_passed {
            header_passed = line.trim().starts_with("---");
            continue;
        }
        // A second table (packages needing explicit targeting) repeats the
        // header and divider mid-stream.
        if line.trim().starts_with("---") {
            continue;
        }
        let row: Vec<char> = line.chars().collect();
        let id = column(&row, columns.id, columns.version);
        if id.is_empty() || id == "Id" {
            continue;
        }
        packages.push(UpgradablePackage {
            name: column(&row, 0, columns.id),
            id,
            current_version: column(&row, columns.version, columns.available),
            available_version: column(&row, columns.available, columns.source),
            source: column(&row, columns.source, row.len()),
        });
    }
    packages
}

/// Runs `winget upgrade` and parses its table.
#[cfg(windows)]
pub fn list_upgrades() -> Result<Vec<UpgradablePackage>> {
    let output = crate::utils::command::run_hidden_checked("winget", &["upgrade"])?;
    Ok(parse_upgrade_listing(&output))
}

/// Argument list for one upgrade run; no id means everything at once.
/// The bulk form runs installers silently, the single form shows them.
pub fn upgrade_arguments(id: Option<&str>) -> Vec<String> {
    let mut arguments = vec!["upgrade".to_string()];
    match id {
        Some(id) => {
            arguments.push("--id".to_string());
            arguments.push(id.to_string());
        }
        None => {
            arguments.push("--all".to_string());
            arguments.push("--silent".to_string());
        }
    }
    arguments.push("--accept-source-agreements".to_string());
    arguments.push("--accept-package-agreements".to_string());
    arguments
}

/// Upgrades a single package by id.
#[cfg(windows)]
pub fn upgrade_package(id: &str) -> Result<()> {
    run_upgrade(&upgrade_arguments(Some(id)))
}

/// Upgrades every package with a pending upgrade in one run.
#[cfg(windows)]
pub fn upgrade_all() -> Result<()> {
    run_upgrade(&upgrade_arguments(None))
}

/// When the current process is elevated the child's output is streamed
/// through the log as it arrives; otherwise the run goes through a UAC
/// prompt and only the exit code comes back.
#[cfg(windows)]
fn run_upgrade(arguments: &[String]) -> Result<()> {
    use std::io::{BufRead, BufReader};
    use std::process::Stdio;

    use anyhow::Context;

    use crate::utils::command::hidden_command;
    use crate::utils::windows::{is_elevated, run_elevated};

    if !is_elevated() {
        let code = run_elevated("winget", &arguments.join(" "))?;
        if code != 0 {
            anyhow::bail!("winget exited with {}", code);
        }
        return Ok(());
    }

    let mut child = hidden_command("winget")
        .args(arguments)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to start winget")?;

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            let line = line.unwrap_or_default();
            let line = line.trim();
            if !line.is_empty() {
                tracing::info!("[winget] {}", line);
            }
        }
    }

    let status = child.wait().context("failed to wait for winget")?;
    if !status.success() {
        anyhow::bail!("winget exited with {}", status);
    }
    Ok(())
}

#[cfg(not(windows))]
pub fn list_upgrades() -> Result<Vec<UpgradablePackage>> {
    anyhow::bail!("winget is only available on Windows")
}

#[cfg(not(windows))]
pub fn upgrade_package(_id: &str) -> Result<()> {
    anyhow::bail!("winget is only available on Windows")
}

#[cfg(not(windows))]
pub fn upgrade_all() -> Result<()> {
    anyhow::bail!("winget is only available on Windows")
}
