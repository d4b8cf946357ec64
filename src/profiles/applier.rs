// src/profiles/applier.rs

//! The apply/restore state machine.
//!
//! Applying a non-General profile captures a one-time baseline, switches the
//! power plan (the authoritative step) and then walks a fixed list of
//! best-effort groups. Restoring reverses everything recorded in the baseline
//! and erases it; applying General is the same operation.
//!
//! Known asymmetry, kept on purpose: baselines are recorded before the first
//! mutation of a service, so a service that a profile happened to *start*
//! (never recorded, because only stop targets are observed) is not stopped
//! again on restore. Likewise the services stopped by the telemetry, indexing
//! and update-pause flags are not recorded; restore brings back exactly what
//! the stop list touched.

use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use super::catalog::ProfileCatalog;
use super::snapshot::SnapshotStore;
use super::{
    ApplyOutcome, ApplyReport, PlanId, ProfileConfig, ProfileMode, ProfileStep, StartType,
    StepReport, SystemSnapshot,
};
use crate::adapters::{AdapterSet, PriorityClass};
use crate::constants::{INDEXING_SERVICE, TELEMETRY_SERVICES, UPDATE_SERVICE};
use crate::errors::{EngineError, PowerError};

pub struct ProfileApplier {
    catalog: ProfileCatalog,
    snapshots: SnapshotStore,
    adapters: AdapterSet,
    /// Serializes apply/restore so two runs can never interleave their
    /// read-snapshot / record-baseline / persist sequences.
    lock: Mutex<()>,
}

impl ProfileApplier {
    pub fn new(catalog: ProfileCatalog, snapshots: SnapshotStore, adapters: AdapterSet) -> Self {
        Self {
            catalog,
            snapshots,
            adapters,
            lock: Mutex::new(()),
        }
    }

    /// Applies `mode`. The returned report's outcome mirrors the power-plan
    /// step; only persistence problems and orchestration bugs surface as
    /// `Err`.
    pub fn apply(&self, mode: ProfileMode) -> Result<ApplyReport, EngineError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| EngineError::Unexpected("engine lock poisoned".to_string()))?;
        if mode == ProfileMode::General {
            return self.restore_locked();
        }
        self.apply_locked(mode)
    }

    /// Reverses every recorded mutation and clears the baseline.
    pub fn restore(&self) -> Result<ApplyReport, EngineError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| EngineError::Unexpected("engine lock poisoned".to_string()))?;
        self.restore_locked()
    }

    fn apply_locked(&self, mode: ProfileMode) -> Result<ApplyReport, EngineError> {
        let config = self.catalog.resolve(mode);
        debug!("{:?} -> applying profile", mode);

        let mut snapshot = self.snapshots.ensure_baseline(self.adapters.power.as_ref())?;
        let mut steps = Vec::new();

        let outcome = self.switch_power_plan(&config.power_plan_guid, &mut steps);

        if config.reduce_background_priority {
            self.best_effort(ProfileStep::BackgroundPriority, None, &mut steps, || {
                self.adapters
                    .processes
                    .reduce_background_priority(PriorityClass::BelowNormal)
                    .map_err(EngineError::from)
            });
        }

        self.stop_profile_services(&config, &mut snapshot, &mut steps)?;

        if config.auto_clean_ram {
            self.best_effort(ProfileStep::MemoryClean, None, &mut steps, || {
                self.adapters.processes.optimize_ram().map_err(EngineError::from)
            });
        }

        if config.optimize_visual_effects {
            self.best_effort(ProfileStep::VisualEffects, None, &mut steps, || {
                self.adapters
                    .tweaks
                    .set_visual_effects(true)
                    .map_err(EngineError::from)
            });
        }

        if config.pause_windows_update {
            // A stopped update service is what "paused" means here.
            self.best_effort(ProfileStep::UpdatePause, Some(UPDATE_SERVICE), &mut steps, || {
                self.adapters.services.stop(UPDATE_SERVICE).map_err(EngineError::from)
            });
        }

        if config.disable_network_throttling {
            self.best_effort(ProfileStep::NetworkThrottling, None, &mut steps, || {
                self.adapters
                    .tweaks
                    .set_network_throttling(true)
                    .map_err(EngineError::from)
            });
        }

        if config.disable_telemetry {
            for name in TELEMETRY_SERVICES {
                self.best_effort(ProfileStep::Telemetry, Some(name), &mut steps, || {
                    self.adapters.services.stop(name).map_err(EngineError::from)
                });
            }
        }

        if config.disable_indexing {
            self.best_effort(ProfileStep::Indexing, Some(INDEXING_SERVICE), &mut steps, || {
                self.adapters
                    .services
                    .stop(INDEXING_SERVICE)
                    .map_err(EngineError::from)
            });
        }

        debug!("{:?} -> profile applied ({} steps)", mode, steps.len());
        Ok(ApplyReport {
            mode,
            outcome,
            steps,
        })
    }

    fn restore_locked(&self) -> Result<ApplyReport, EngineError> {
        let snapshot = match self.snapshots.load()? {
            Some(snapshot) => snapshot,
            None => {
                debug!("no baseline present, nothing to restore");
                return Ok(ApplyReport {
                    mode: ProfileMode::General,
                    outcome: ApplyOutcome::success("No profile active, nothing to restore"),
                    steps: Vec::new(),
                });
            }
        };

        let mut steps = Vec::new();

        if let Some(plan) = &snapshot.original_power_plan {
            // Best-effort on restore: declining the prompt here forfeits the
            // power-plan rollback but never blocks the service rollback.
            self.best_effort(ProfileStep::PowerPlan, None, &mut steps, || {
                self.adapters.power.set_active_plan(plan).map_err(EngineError::from)
            });
        }

        for (name, state) in &snapshot.services {
            self.best_effort(ProfileStep::Services, Some(name), &mut steps, || {
                self.adapters
                    .services
                    .set_start_type(name, state.start_type)
                    .map_err(EngineError::from)
            });
            if state.was_running {
                self.best_effort(ProfileStep::Services, Some(name), &mut steps, || {
                    self.adapters.services.start(name).map_err(EngineError::from)
                });
            }
        }

        self.snapshots.clear()?;
        info!("baseline restored and cleared");
        Ok(ApplyReport {
            mode: ProfileMode::General,
            outcome: ApplyOutcome::success("Original system state restored"),
            steps,
        })
    }

    /// The authoritative step: its outcome is the operation's outcome.
    fn switch_power_plan(&self, plan: &PlanId, steps: &mut Vec<StepReport>) -> ApplyOutcome {
        match self.adapters.power.set_active_plan(plan) {
            Ok(()) => {
                debug!("active power plan set to {}", plan);
                steps.push(StepReport::ok(ProfileStep::PowerPlan));
                ApplyOutcome::success(format!("Power plan set to {}", plan))
            }
            Err(PowerError::ElevationCancelled) => {
                info!("power plan change declined at the elevation prompt");
                steps.push(StepReport::failed(
                    ProfileStep::PowerPlan,
                    EngineError::ElevationCancelled.to_string(),
                ));
                ApplyOutcome::cancelled()
            }
            Err(e) => {
                error!("power plan change failed: {}", e);
                steps.push(StepReport::failed(ProfileStep::PowerPlan, e.to_string()));
                ApplyOutcome::failure(e.to_string())
            }
        }
    }

    /// Stops every service in the profile's stop list, recording each one's
    /// pre-profile state first. The snapshot is persisted once after the loop
    /// when anything new was recorded; a failed save aborts the apply, since
    /// continuing would leave mutations with no recorded way back.
    fn stop_profile_services(
        &self,
        config: &ProfileConfig,
        snapshot: &mut SystemSnapshot,
        steps: &mut Vec<StepReport>,
    ) -> Result<(), EngineError> {
        if config.services_to_stop.is_empty() {
            return Ok(());
        }

        let known = match self.adapters.services.list() {
            Ok(list) => list,
            Err(e) => {
                let e = EngineError::from(e);
                warn!("service enumeration failed: {}", e);
                steps.push(StepReport::failed(ProfileStep::Services, e.to_string()));
                return Ok(());
            }
        };

        let mut dirty = false;
        for name in &config.services_to_stop {
            let Some(info) = known.iter().find(|s| s.name.eq_ignore_ascii_case(name)) else {
                debug!("service '{}' not present on this host, skipping", name);
                continue;
            };

            // First-touch wins: a baseline recorded by an earlier profile in
            // this session stays authoritative.
            if snapshot.record_service_if_absent(&info.name, info.start_type, info.is_running) {
                debug!(
                    "recorded baseline for '{}' ({:?}, running={})",
                    info.name, info.start_type, info.is_running
                );
                dirty = true;
            }

            self.best_effort(ProfileStep::Services, Some(&info.name), steps, || {
                self.adapters
                    .services
                    .set_start_type(&info.name, StartType::Manual)
                    .map_err(EngineError::from)?;
                self.adapters.services.stop(&info.name).map_err(EngineError::from)
            });
        }

        if dirty {
            self.snapshots.save(snapshot)?;
        }
        Ok(())
    }

    /// Runs one advisory group, logging failures without propagating them.
    fn best_effort<F>(
        &self,
        step: ProfileStep,
        subject: Option<&str>,
        steps: &mut Vec<StepReport>,
        operation: F,
    ) where
        F: FnOnce() -> Result<(), EngineError>,
    {
        match operation() {
            Ok(()) => {
                let mut report = StepReport::ok(step);
                if let Some(subject) = subject {
                    report = report.with_subject(subject);
                }
                steps.push(report);
            }
            Err(e) => {
                match e {
                    EngineError::ElevationCancelled => info!("{} step declined by the user", step),
                    ref other => warn!("{} step failed: {}", step, other),
                }
                let mut report = StepReport::failed(step, e.to_string());
                if let Some(subject) = subject {
                    report = report.with_subject(subject);
                }
                steps.push(report);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::adapters::testing::{mock_adapters, MockHandles};
    use crate::adapters::AdapterSet;
    use crate::constants::{BALANCED_PLAN, HIGH_PERFORMANCE_PLAN};
    use crate::settings::SettingsStore;

    fn engine_in(dir: &TempDir, adapters: AdapterSet) -> ProfileApplier {
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")));
        ProfileApplier::new(
            ProfileCatalog::new(settings),
            SnapshotStore::new(dir.path().join("snapshot.json")),
            adapters,
        )
    }

    fn gamer_host() -> (AdapterSet, MockHandles) {
        let (set, handles) = mock_adapters(BALANCED_PLAN);
        handles.services.insert("SysMain", StartType::Automatic, true);
        handles.services.insert("WSearch", StartType::Automatic, true);
        handles.services.insert("DiagTrack", StartType::Automatic, true);
        handles.services.insert("dmwappushservice", StartType::Manual, false);
        handles.services.insert("wuauserv", StartType::Manual, true);
        (set, handles)
    }

    #[test]
    fn apply_gamer_switches_plan_and_stops_services() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = gamer_host();
        let engine = engine_in(&dir, set);

        let report = engine.apply(ProfileMode::Gamer).unwrap();

        assert!(report.outcome.success);
        assert_eq!(handles.power.current(), PlanId::from(HIGH_PERFORMANCE_PLAN));
        assert_eq!(
            handles.services.state("SysMain"),
            Some((StartType::Manual, false))
        );
        assert_eq!(
            handles.services.state("WSearch"),
            Some((StartType::Manual, false))
        );
        // Telemetry and update stops happen, but without baselines.
        assert_eq!(handles.services.state("DiagTrack").unwrap().1, false);
        assert_eq!(handles.services.state("wuauserv").unwrap().1, false);
    }

    #[test]
    fn apply_reports_every_group_it_ran() {
        let dir = TempDir::new().unwrap();
        let (set, _handles) = gamer_host();
        let engine = engine_in(&dir, set);

        let report = engine.apply(ProfileMode::Gamer).unwrap();

        assert!(report.steps.iter().all(|s| s.outcome.is_ok()));
        let kinds: Vec<_> = report.steps.iter().map(|s| s.step).collect();
        assert_eq!(
            kinds,
            vec![
                ProfileStep::PowerPlan,
                ProfileStep::BackgroundPriority,
                ProfileStep::Services,
                ProfileStep::Services,
                ProfileStep::MemoryClean,
                ProfileStep::VisualEffects,
                ProfileStep::UpdatePause,
                ProfileStep::NetworkThrottling,
                ProfileStep::Telemetry,
                ProfileStep::Telemetry,
                ProfileStep::Indexing,
            ]
        );
        // TabletInputService and PrintNotify are absent from the mock host,
        // so only two service stops show up.
        let stopped: Vec<_> = report
            .steps
            .iter()
            .filter(|s| s.step == ProfileStep::Services)
            .map(|s| s.subject.as_deref())
            .collect();
        assert_eq!(stopped, vec![Some("SysMain"), Some("WSearch")]);
    }

    #[test]
    fn apply_records_the_expected_baseline() {
        let dir = TempDir::new().unwrap();
        let (set, _handles) = gamer_host();
        let engine = engine_in(&dir, set);

        engine.apply(ProfileMode::Gamer).unwrap();

        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let snapshot = store.load().unwrap().unwrap();
        assert_eq!(snapshot.original_power_plan, Some(PlanId::from(BALANCED_PLAN)));
        assert_eq!(snapshot.services.len(), 2);
        assert_eq!(
            snapshot.services["SysMain"],
            crate::profiles::ServiceStateSnapshot {
                start_type: StartType::Automatic,
                was_running: true
            }
        );
        assert_eq!(
            snapshot.services["WSearch"],
            crate::profiles::ServiceStateSnapshot {
                start_type: StartType::Automatic,
                was_running: true
            }
        );
    }

    #[test]
    fn apply_general_restores_everything() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = gamer_host();
        let engine = engine_in(&dir, set);

        engine.apply(ProfileMode::Gamer).unwrap();
        let report = engine.apply(ProfileMode::General).unwrap();

        assert!(report.outcome.success);
        assert_eq!(report.mode, ProfileMode::General);
        assert_eq!(handles.power.current(), PlanId::from(BALANCED_PLAN));
        assert_eq!(
            handles.services.state("SysMain"),
            Some((StartType::Automatic, true))
        );
        assert_eq!(
            handles.services.state("WSearch"),
            Some((StartType::Automatic, true))
        );

        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn restore_is_idempotent_and_silent_the_second_time() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = gamer_host();
        let engine = engine_in(&dir, set);

        engine.apply(ProfileMode::Gamer).unwrap();
        assert!(engine.restore().unwrap().outcome.success);

        handles.log.take();
        let second = engine.restore().unwrap();
        assert!(second.outcome.success);
        assert!(second.steps.is_empty());
        assert!(handles.log.take().is_empty());
    }

    #[test]
    fn baseline_is_never_overwritten_by_a_later_profile() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = gamer_host();
        handles.services.insert("Spooler", StartType::Manual, false);
        let engine = engine_in(&dir, set);

        // Gamer touches WSearch first; Developer stops it again later.
        engine.apply(ProfileMode::Gamer).unwrap();
        engine.apply(ProfileMode::Developer).unwrap();

        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let snapshot = store.load().unwrap().unwrap();
        let wsearch = &snapshot.services["WSearch"];
        assert_eq!(wsearch.start_type, StartType::Automatic);
        assert!(wsearch.was_running);
        // Spooler was first touched by Developer, in its pre-profile state.
        let spooler = &snapshot.services["Spooler"];
        assert_eq!(spooler.start_type, StartType::Manual);
        assert!(!spooler.was_running);

        engine.restore().unwrap();
        assert_eq!(
            handles.services.state("WSearch"),
            Some((StartType::Automatic, true))
        );
        assert_eq!(
            handles.services.state("Spooler"),
            Some((StartType::Manual, false))
        );
    }

    #[test]
    fn inert_profile_round_trip_only_touches_power() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = gamer_host();
        let engine = engine_in(&dir, set);

        engine.apply(ProfileMode::Office).unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        assert!(store.load().unwrap().unwrap().services.is_empty());

        engine.restore().unwrap();
        let calls = handles.log.take();
        assert!(calls.iter().all(|c| c.starts_with("power.set")), "{:?}", calls);
    }

    #[test]
    fn cancelled_elevation_is_a_distinct_outcome_and_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = gamer_host();
        handles.power.fail_next(PowerError::ElevationCancelled);
        let engine = engine_in(&dir, set);

        let report = engine.apply(ProfileMode::Gamer).unwrap();

        assert!(!report.outcome.success);
        assert!(report.outcome.cancelled);
        // The best-effort groups still ran.
        assert_eq!(
            handles.services.state("SysMain"),
            Some((StartType::Manual, false))
        );
    }

    #[test]
    fn power_failure_fails_the_outcome_but_not_the_call() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = gamer_host();
        handles
            .power
            .fail_next(PowerError::Activate("x".to_string(), "denied".to_string()));
        let engine = engine_in(&dir, set);

        let report = engine.apply(ProfileMode::Gamer).unwrap();
        assert!(!report.outcome.success);
        assert!(!report.outcome.cancelled);
    }

    #[test]
    fn corrupt_snapshot_aborts_both_operations() {
        let dir = TempDir::new().unwrap();
        let (set, _handles) = gamer_host();
        let engine = engine_in(&dir, set);
        std::fs::write(dir.path().join("snapshot.json"), "garbage").unwrap();

        assert!(matches!(
            engine.apply(ProfileMode::Gamer),
            Err(EngineError::Persistence(_))
        ));
        assert!(matches!(engine.restore(), Err(EngineError::Persistence(_))));
    }

    #[test]
    fn restore_uses_the_persisted_snapshot_across_restarts() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = gamer_host();
        let engine = engine_in(&dir, set);
        engine.apply(ProfileMode::Gamer).unwrap();
        drop(engine);

        // A fresh engine over the same data directory sees the same baseline.
        let (set2, handles2) = mock_adapters(HIGH_PERFORMANCE_PLAN);
        handles2.services.insert("SysMain", StartType::Manual, false);
        handles2.services.insert("WSearch", StartType::Manual, false);
        let engine2 = engine_in(&dir, set2);

        let report = engine2.restore().unwrap();
        assert!(report.outcome.success);
        assert_eq!(handles2.power.current(), PlanId::from(BALANCED_PLAN));
        assert_eq!(
            handles2.services.state("SysMain"),
            Some((StartType::Automatic, true))
        );
        drop(handles);
    }

    #[test]
    fn missing_services_are_skipped_silently() {
        let dir = TempDir::new().unwrap();
        let (set, handles) = mock_adapters(BALANCED_PLAN);
        handles.services.insert("WSearch", StartType::Automatic, true);
        let engine = engine_in(&dir, set);

        // Gamer's stop list names services this host does not have.
        let report = engine.apply(ProfileMode::Gamer).unwrap();
        assert!(report.outcome.success);

        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let snapshot = store.load().unwrap().unwrap();
        assert_eq!(snapshot.services.len(), 1);
        assert!(snapshot.services.contains_key("WSearch"));
    }
}
