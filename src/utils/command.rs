// src/utils/command.rs

//! Console-less child processes. Every external tool the probes shell out to
//! goes through here so no console window flashes while the watcher or a
//! scheduled run is active.

use std::process::{Command, Output};

use anyhow::{Context, Result};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// A `Command` pre-configured to run without a console window. For callers
/// that need to stream output instead of capturing it.
pub fn hidden_command(program: &str) -> Command {
    let mut command = Command::new(program);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}

/// Runs `program` with `args` and captures its output, without spawning a
/// visible console window.
pub fn run_hidden(program: &str, args: &[&str]) -> Result<Output> {
    hidden_command(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run '{}'", program))
}

/// Like [`run_hidden`] but treats a non-zero exit status as an error and
/// returns trimmed stdout.
pub fn run_hidden_checked(program: &str, args: &[&str]) -> Result<String> {
    let output = run_hidden(program, args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "'{}' exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Runs a PowerShell one-liner without profile or execution-policy friction.
pub fn run_powershell(script: &str) -> Result<String> {
    run_hidden_checked(
        "powershell",
        &["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", script],
    )
}
