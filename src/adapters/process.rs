// src/adapters/process.rs

use tracing::debug;
use widestring::U16CStr;
use windows::Win32::{
    Foundation::CloseHandle,
    System::{
        Diagnostics::ToolHelp::{
            CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
            TH32CS_SNAPPROCESS,
        },
        ProcessStatus::EmptyWorkingSet,
        Threading::{
            OpenProcess, SetPriorityClass, TerminateProcess, BELOW_NORMAL_PRIORITY_CLASS,
            IDLE_PRIORITY_CLASS, NORMAL_PRIORITY_CLASS, PROCESS_CREATION_FLAGS,
            PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_SET_INFORMATION, PROCESS_SET_QUOTA,
            PROCESS_TERMINATE,
        },
    },
    UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId},
};

use super::{PriorityClass, ProcessAdapter};
use crate::errors::ProcessError;

/// Processes whose priority is never touched and which are never terminated.
const CRITICAL_PROCESSES: &[&str] = &[
    "system", "idle", "smss", "csrss", "wininit", "winlogon", "services", "lsass", "svchost",
    "dwm", "explorer",
];

pub struct WindowsProcesses;

struct ProcessEntry {
    pid: u32,
    name: String,
}

/// One pass over the ToolHelp process snapshot.
fn snapshot_entries() -> Result<Vec<ProcessEntry>, ProcessError> {
    let mut entries = Vec::new();
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| ProcessError::SnapshotFailed(e.to_string()))?;
        if snapshot.is_invalid() {
            return Err(ProcessError::SnapshotFailed(
                "invalid snapshot handle".to_string(),
            ));
        }

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let name = U16CStr::from_slice_truncate(&entry.szExeFile)
                    .map(|s| s.to_string_lossy())
                    .unwrap_or_default();
                entries.push(ProcessEntry {
                    pid: entry.th32ProcessID,
                    name,
                });
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        let _ = CloseHandle(snapshot);
    }
    Ok(entries)
}

fn foreground_pid() -> u32 {
    unsafe {
        let hwnd = GetForegroundWindow();
        let mut pid = 0u32;
        GetWindowThreadProcessId(hwnd, Some(&mut pid));
        pid
    }
}

/// Lowercase name with a trailing `.exe` removed.
fn name_stem(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    lower
        .strip_suffix(".exe")
        .map(|s| s.to_string())
        .unwrap_or(lower)
}

fn is_critical(name: &str) -> bool {
    let stem = name_stem(name);
    CRITICAL_PROCESSES.iter().any(|c| stem == *c)
}

fn priority_to(class: PriorityClass) -> PROCESS_CREATION_FLAGS {
    match class {
        PriorityClass::Normal => NORMAL_PRIORITY_CLASS,
        PriorityClass::BelowNormal => BELOW_NORMAL_PRIORITY_CLASS,
        PriorityClass::Idle => IDLE_PRIORITY_CLASS,
    }
}

impl ProcessAdapter for WindowsProcesses {
    /// Drops every reachable background process to `class`, leaving the
    /// foreground process, this process and the critical set alone. Processes
    /// we cannot open are skipped; most protected ones refuse access.
    fn reduce_background_priority(&self, class: PriorityClass) -> Result<(), ProcessError> {
        let entries = snapshot_entries().map_err(|e| ProcessError::PriorityFailed(e.to_string()))?;
        let self_pid = std::process::id();
        let foreground = foreground_pid();
        let priority = priority_to(class);

        let mut adjusted = 0u32;
        for entry in &entries {
            if entry.pid == 0 || entry.pid == self_pid || entry.pid == foreground {
                continue;
            }
            if is_critical(&entry.name) {
                continue;
            }
            unsafe {
                let Ok(handle) = OpenProcess(PROCESS_SET_INFORMATION, false, entry.pid) else {
                    continue;
                };
                if SetPriorityClass(handle, priority).is_ok() {
                    adjusted += 1;
                }
                let _ = CloseHandle(handle);
            }
        }
        debug!("priority lowered for {} background processes", adjusted);
        Ok(())
    }

    /// Empties the working set of every process that lets us, the same
    /// psapi call Task Manager's "empty working set" uses.
    fn optimize_ram(&self) -> Result<(), ProcessError> {
        let entries = snapshot_entries().map_err(|e| ProcessError::TrimFailed(e.to_string()))?;
        let self_pid = std::process::id();

        let mut trimmed = 0u32;
        for entry in &entries {
            if entry.pid == 0 || entry.pid == self_pid {
                continue;
            }
            unsafe {
                let Ok(handle) = OpenProcess(
                    PROCESS_SET_QUOTA | PROCESS_QUERY_LIMITED_INFORMATION,
                    false,
                    entry.pid,
                ) else {
                    continue;
                };
                if EmptyWorkingSet(handle).is_ok() {
                    trimmed += 1;
                }
                let _ = CloseHandle(handle);
            }
        }
        debug!("working sets emptied for {} processes", trimmed);
        Ok(())
    }

    fn running_processes(&self) -> Result<Vec<String>, ProcessError> {
        Ok(snapshot_entries()?
            .into_iter()
            .map(|entry| entry.name)
            .filter(|name| !name.is_empty())
            .collect())
    }

    fn kill_processes(&self, names: &[String]) -> Result<usize, ProcessError> {
        let entries = snapshot_entries()?;
        let self_pid = std::process::id();

        let mut killed = 0usize;
        for entry in &entries {
            if entry.pid == 0 || entry.pid == self_pid || is_critical(&entry.name) {
                continue;
            }
            let stem = name_stem(&entry.name);
            if !names.iter().any(|target| stem == name_stem(target)) {
                continue;
            }
            unsafe {
                let Ok(handle) = OpenProcess(PROCESS_TERMINATE, false, entry.pid) else {
                    debug!("cannot open '{}' ({}) for termination", entry.name, entry.pid);
                    continue;
                };
                if TerminateProcess(handle, 1).is_ok() {
                    debug!("terminated '{}' ({})", entry.name, entry.pid);
                    killed += 1;
                }
                let _ = CloseHandle(handle);
            }
        }
        Ok(killed)
    }
}
