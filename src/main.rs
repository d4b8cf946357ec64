// src/main.rs

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use perfmode::{
    adapters::AdapterSet,
    orchestrator::{ProfileAction, ProfileOrchestrator, ProfileTaskResult},
    profiles::{
        applier::ProfileApplier, catalog::ProfileCatalog, snapshot::SnapshotStore, ApplyReport,
        ProfileMode, SystemSnapshot,
    },
    settings::SettingsStore,
    system::{bloatware, disk, security, startup, winget},
    watcher::ProfileWatcher,
};

#[derive(Parser)]
#[command(name = "perfmode", version, about = "Performance profiles and a system toolbox")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Show elevation, the active power plan and the persisted baseline.
    Status,
    /// Apply a performance profile.
    Apply {
        /// general, gamer, developer, office or custom
        mode: ProfileMode,
    },
    /// Put the host back into its pre-profile state.
    Restore,
    /// Show the persisted baseline snapshot in full.
    Report,
    /// Poll for trigger processes and boost automatically.
    Watch {
        /// Poll interval in seconds; defaults to the settings value.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Installed-application inventory.
    #[command(subcommand)]
    Bloatware(BloatwareCommand),
    /// Physical disks and their SMART predictions.
    Disk,
    /// Antivirus, firewall and UAC status.
    Security,
    /// Logon autostart entries.
    #[command(subcommand)]
    Startup(StartupCommand),
    /// Winget package upgrades.
    #[command(subcommand)]
    Winget(WingetCommand),
}

#[derive(Subcommand)]
enum BloatwareCommand {
    /// List removable applications.
    List,
    /// Launch the uninstaller of an application, elevated.
    Uninstall { name: String },
}

#[derive(Subcommand)]
enum StartupCommand {
    /// List live and parked entries.
    List,
    /// Move a parked entry back to its Run key.
    Enable { name: String },
    /// Park an entry so it stops launching at logon.
    Disable { name: String },
}

#[derive(Subcommand)]
enum WingetCommand {
    /// List packages with pending upgrades.
    List,
    /// Upgrade one package by id, or everything with --all.
    Upgrade {
        /// Package id, as shown by `winget list`.
        id: Option<String>,
        /// Upgrade every package with a pending upgrade.
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
}

fn init_logging() {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(windows)]
fn platform_adapters() -> AdapterSet {
    use perfmode::adapters::{
        power::WindowsPowerPlans, process::WindowsProcesses, service::WindowsServices,
        tweaks::WindowsTweaks,
    };
    AdapterSet {
        power: Arc::new(WindowsPowerPlans),
        services: Arc::new(WindowsServices),
        processes: Arc::new(WindowsProcesses),
        tweaks: Arc::new(WindowsTweaks),
    }
}

#[cfg(not(windows))]
fn platform_adapters() -> AdapterSet {
    AdapterSet::noop()
}

#[cfg(windows)]
fn is_elevated() -> bool {
    perfmode::utils::windows::is_elevated()
}

#[cfg(not(windows))]
fn is_elevated() -> bool {
    false
}

fn build_orchestrator() -> ProfileOrchestrator {
    let settings = Arc::new(SettingsStore::at_default_location());
    let applier = Arc::new(ProfileApplier::new(
        ProfileCatalog::new(settings),
        SnapshotStore::at_default_location(),
        platform_adapters(),
    ));
    ProfileOrchestrator::new(applier)
}

fn fail(e: anyhow::Error) -> ExitCode {
    eprintln!("error: {:#}", e);
    ExitCode::from(1)
}

fn print_report(report: &ApplyReport) {
    println!("[{}] {}", report.mode, report.outcome.message);
    for step in &report.steps {
        println!("  {}", step);
    }
}

fn run_profile_action(action: ProfileAction) -> ExitCode {
    let orchestrator = build_orchestrator();
    if let Err(e) = orchestrator.submit(action) {
        return fail(e);
    }
    match orchestrator.recv_result() {
        Ok(ProfileTaskResult {
            outcome: Ok(report),
            ..
        }) => {
            print_report(&report);
            if report.outcome.cancelled {
                ExitCode::from(2)
            } else if report.outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Ok(ProfileTaskResult {
            outcome: Err(e), ..
        }) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
        Err(e) => fail(e),
    }
}

fn describe_snapshot(snapshot: &SystemSnapshot) -> String {
    let plan = match &snapshot.original_power_plan {
        Some(plan) => format!("plan {}", plan),
        None => "no plan recorded".to_string(),
    };
    format!("{}, {} service(s)", plan, snapshot.services.len())
}

fn show_status() -> ExitCode {
    println!("Elevated: {}", if is_elevated() { "yes" } else { "no" });

    match platform_adapters().power.active_plan() {
        Ok(plan) => println!("Active power plan: {}", plan),
        Err(e) => println!("Active power plan: unavailable ({})", e),
    }

    match SnapshotStore::at_default_location().load() {
        Ok(Some(snapshot)) => {
            println!("Profile active: yes ({})", describe_snapshot(&snapshot));
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("Profile active: no");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn show_report() -> ExitCode {
    match SnapshotStore::at_default_location().load() {
        Ok(Some(snapshot)) => {
            match &snapshot.original_power_plan {
                Some(plan) => println!("Original power plan: {}", plan),
                None => println!("Original power plan: not recorded"),
            }
            if snapshot.services.is_empty() {
                println!("No service baselines recorded.");
            } else {
                println!("Service baselines:");
                for (name, state) in &snapshot.services {
                    println!(
                        "  {}: {:?}, {}",
                        name,
                        state.start_type,
                        if state.was_running { "was running" } else { "was stopped" }
                    );
                }
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("No snapshot. The host is in its original state.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run_watcher(interval_flag: Option<u64>) -> ExitCode {
    let settings = Arc::new(SettingsStore::at_default_location());
    let secs = interval_flag.unwrap_or_else(|| settings.load().watch_interval_secs);

    let adapters = platform_adapters();
    let processes = Arc::clone(&adapters.processes);
    let catalog = ProfileCatalog::new(Arc::clone(&settings));
    let applier = Arc::new(ProfileApplier::new(
        ProfileCatalog::new(settings),
        SnapshotStore::at_default_location(),
        adapters,
    ));

    let mut watcher = ProfileWatcher::new(catalog, processes, ProfileOrchestrator::new(applier));
    watcher.run(Duration::from_secs(secs));
    ExitCode::SUCCESS
}

fn show_bloatware() -> ExitCode {
    match bloatware::list_apps() {
        Ok(apps) => {
            if apps.is_empty() {
                println!("Nothing removable found.");
            }
            for app in apps {
                let publisher = if app.publisher.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", app.publisher)
                };
                let marker = if app.system_app { " [system]" } else { "" };
                println!("{}{}{}", app.name, publisher, marker);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn show_disks() -> ExitCode {
    match disk::collect_disk_health() {
        Ok(disks) => {
            if disks.is_empty() {
                println!("No physical disks reported.");
            }
            for d in disks {
                let size = d
                    .size_bytes
                    .map(|bytes| format!("{:.1} GB", bytes as f64 / 1e9))
                    .unwrap_or_else(|| "size unknown".to_string());
                let smart = match d.smart_ok {
                    Some(true) => "SMART ok",
                    Some(false) => "SMART FAILURE PREDICTED",
                    None => "SMART unknown",
                };
                println!("{}  {}  {}  {}", d.device_id, d.model, size, smart);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn show_security() -> ExitCode {
    match security::collect_security_report() {
        Ok(report) => {
            println!(
                "Antivirus: {} ({})",
                report.antivirus.as_deref().unwrap_or("none detected"),
                if report.antivirus_enabled { "on" } else { "off" }
            );
            println!("Firewall:  {}", if report.firewall_enabled { "on" } else { "off" });
            println!("UAC:       {}", if report.uac_enabled { "on" } else { "off" });
            println!("Overall:   {}", report.summary());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn show_startup_entries() -> ExitCode {
    match startup::list_entries() {
        Ok(entries) => {
            if entries.is_empty() {
                println!("No startup entries.");
            }
            for entry in entries {
                println!(
                    "{:<9} {:<15} {}  {}",
                    if entry.enabled { "enabled" } else { "disabled" },
                    entry.location.label(),
                    entry.name,
                    entry.command
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn show_winget_upgrades() -> ExitCode {
    match winget::list_upgrades() {
        Ok(packages) => {
            if packages.is_empty() {
                println!("Everything is up to date.");
            }
            for package in packages {
                println!(
                    "{}  {}  {} -> {}  ({})",
                    package.name,
                    package.id,
                    package.current_version,
                    package.available_version,
                    package.source
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Status => show_status(),
        CliCommand::Apply { mode } => run_profile_action(ProfileAction::Apply(mode)),
        CliCommand::Restore => run_profile_action(ProfileAction::Restore),
        CliCommand::Report => show_report(),
        CliCommand::Watch { interval } => run_watcher(interval),
        CliCommand::Bloatware(BloatwareCommand::List) => show_bloatware(),
        CliCommand::Bloatware(BloatwareCommand::Uninstall { name }) => {
            match bloatware::uninstall_app(&name) {
                Ok(()) => {
                    println!("Uninstaller for '{}' finished.", name);
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }
        CliCommand::Disk => show_disks(),
        CliCommand::Security => show_security(),
        CliCommand::Startup(StartupCommand::List) => show_startup_entries(),
        CliCommand::Startup(StartupCommand::Enable { name }) => {
            match startup::enable_entry(&name) {
                Ok(location) => {
                    println!("'{}' enabled again under {}.", name, location.label());
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }
        CliCommand::Startup(StartupCommand::Disable { name }) => {
            match startup::disable_entry(&name) {
                Ok(location) => {
                    println!("'{}' parked; it was under {}.", name, location.label());
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }
        CliCommand::Winget(WingetCommand::List) => show_winget_upgrades(),
        CliCommand::Winget(WingetCommand::Upgrade { id: Some(id), .. }) => {
            match winget::upgrade_package(&id) {
                Ok(()) => {
                    println!("'{}' upgraded.", id);
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }
        CliCommand::Winget(WingetCommand::Upgrade { id: None, all: true }) => {
            match winget::upgrade_all() {
                Ok(()) => {
                    println!("All pending upgrades installed.");
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }
        CliCommand::Winget(WingetCommand::Upgrade { id: None, all: false }) => {
            fail(anyhow::anyhow!("pass a package id, or --all for everything"))
        }
    }
}
