// src/watcher.rs

//! Polls the process list and boosts the machine while a trigger process is
//! running. A profile is eligible when its config lists auto-boost processes;
//! the first eligible profile with a live trigger wins.

use std::{sync::Arc, thread, time::Duration};

use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::adapters::ProcessAdapter;
use crate::orchestrator::{ProfileAction, ProfileOrchestrator};
use crate::profiles::catalog::ProfileCatalog;
use crate::profiles::{ProfileConfig, ProfileMode};

pub struct ProfileWatcher {
    catalog: ProfileCatalog,
    processes: Arc<dyn ProcessAdapter>,
    orchestrator: ProfileOrchestrator,
    /// The mode this watcher applied, if any. Restores go through the engine,
    /// so nothing else is tracked here.
    active: Option<ProfileMode>,
}

/// Lowercases and drops a trailing `.exe` so configured names match the
/// process list regardless of how either side spells them.
fn normalize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    lower
        .strip_suffix(".exe")
        .map(|s| s.to_string())
        .unwrap_or(lower)
}

impl ProfileWatcher {
    pub fn new(
        catalog: ProfileCatalog,
        processes: Arc<dyn ProcessAdapter>,
        orchestrator: ProfileOrchestrator,
    ) -> Self {
        Self {
            catalog,
            processes,
            orchestrator,
            active: None,
        }
    }

    /// Polls forever at `interval`. Each pass blocks while a submitted
    /// apply/restore completes, so passes never overlap.
    pub fn run(&mut self, interval: Duration) {
        info!("watching for boost processes every {:?}", interval);
        loop {
            self.scan();
            thread::sleep(interval);
        }
    }

    /// One polling pass. Returns the action that was submitted, if any.
    pub fn scan(&mut self) -> Option<ProfileAction> {
        let running = match self.processes.running_processes() {
            Ok(list) => list.iter().map(|name| normalize(name)).collect::<Vec<_>>(),
            Err(e) => {
                warn!("process list unavailable: {}", e);
                return None;
            }
        };

        match self.find_trigger(&running) {
            Some((mode, config, trigger)) => {
                if self.active == Some(mode) {
                    return None;
                }
                info!("'{}' detected, boosting with the {:?} profile", trigger, mode);
                self.dispatch(ProfileAction::Apply(mode))?;
                self.active = Some(mode);
                if !config.processes_to_kill.is_empty() {
                    match self.processes.kill_processes(&config.processes_to_kill) {
                        Ok(count) if count > 0 => info!("terminated {} background processes", count),
                        Ok(_) => {}
                        Err(e) => warn!("kill list failed: {}", e),
                    }
                }
                Some(ProfileAction::Apply(mode))
            }
            None => {
                // Keep the mode until the restore actually lands, so a failed
                // dispatch is retried on the next pass.
                let mode = self.active?;
                info!("boost processes gone, restoring after {:?}", mode);
                self.dispatch(ProfileAction::Restore)?;
                self.active = None;
                Some(ProfileAction::Restore)
            }
        }
    }

    /// First profile, in declaration order, whose auto-boost list intersects
    /// the running set.
    fn find_trigger(&self, running: &[String]) -> Option<(ProfileMode, ProfileConfig, String)> {
        for mode in ProfileMode::iter() {
            let config = self.catalog.resolve(mode);
            if config.auto_boost_processes.is_empty() {
                continue;
            }
            let hit = config
                .auto_boost_processes
                .iter()
                .find(|candidate| running.contains(&normalize(candidate)));
            if let Some(trigger) = hit {
                let trigger = trigger.clone();
                return Some((mode, config, trigger));
            }
        }
        None
    }

    /// Submits `action` and waits for it, logging the outcome.
    fn dispatch(&self, action: ProfileAction) -> Option<()> {
        if let Err(e) = self.orchestrator.submit(action) {
            warn!("could not submit {:?}: {}", action, e);
            return None;
        }
        match self.orchestrator.recv_result() {
            Ok(result) => match result.outcome {
                Ok(report) if report.outcome.success => {
                    debug!("{:?} finished: {}", action, report.outcome.message);
                    Some(())
                }
                Ok(report) => {
                    warn!("{:?} did not take effect: {}", action, report.outcome.message);
                    Some(())
                }
                Err(e) => {
                    warn!("{:?} failed: {}", action, e);
                    None
                }
            },
            Err(e) => {
                warn!("{:?} result lost: {}", action, e);
                None
            }
        }
    }
}
