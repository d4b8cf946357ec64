// src/profiles/snapshot.rs

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::{PlanId, SystemSnapshot};
use crate::adapters::PowerPlanAdapter;
use crate::constants::{DEFAULT_DATA_DIR, SNAPSHOT_FILE_NAME};
use crate::errors::EngineError;

/// Owns the persisted baseline record.
///
/// The snapshot lives in its own file, apart from user settings, so that
/// saving unrelated configuration can never clobber the baseline. Every read
/// goes back to disk; the store never hands out a cached copy, which keeps
/// restore correct across process restarts. The store itself does no locking,
/// the applier serializes access to it.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn at_default_location() -> Self {
        Self::new(DEFAULT_DATA_DIR.join(SNAPSHOT_FILE_NAME))
    }

    /// Reads the currently persisted baseline.
    ///
    /// A missing file means no profile is active. An unreadable or corrupt
    /// file is a persistence failure: restoring from a guessed baseline would
    /// silently lose state.
    pub fn load(&self) -> Result<Option<SystemSnapshot>, EngineError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            EngineError::Persistence(format!("reading {}: {}", self.path.display(), e))
        })?;
        let snapshot = serde_json::from_str(&raw).map_err(|e| {
            EngineError::Persistence(format!("parsing {}: {}", self.path.display(), e))
        })?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, snapshot: &SystemSnapshot) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Persistence(format!("creating {}: {}", parent.display(), e))
            })?;
        }
        let raw = serde_json::to_string_pretty(snapshot)
            .map_err(|e| EngineError::Persistence(format!("encoding snapshot: {}", e)))?;
        fs::write(&self.path, raw).map_err(|e| {
            EngineError::Persistence(format!("writing {}: {}", self.path.display(), e))
        })?;
        debug!("snapshot persisted to {}", self.path.display());
        Ok(())
    }

    /// Removes the persisted baseline. Missing file counts as cleared.
    pub fn clear(&self) -> Result<(), EngineError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::Persistence(format!(
                "removing {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Returns the existing baseline, or captures and persists a fresh one.
    ///
    /// The baseline records the power plan active right now, before anything
    /// is changed. When the active plan cannot be read the balanced plan is
    /// assumed, with a warning, rather than failing the whole apply.
    pub fn ensure_baseline(
        &self,
        power: &dyn PowerPlanAdapter,
    ) -> Result<SystemSnapshot, EngineError> {
        if let Some(existing) = self.load()? {
            debug!("baseline already present, keeping it");
            return Ok(existing);
        }

        let original_plan = match power.active_plan() {
            Ok(plan) => plan,
            Err(e) => {
                warn!("could not read the active power plan ({}), assuming balanced", e);
                PlanId::balanced()
            }
        };
        let snapshot = SystemSnapshot::new(original_plan);
        self.save(&snapshot)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::adapters::noop::NoopPowerPlan;
    use crate::errors::PowerError;
    use crate::profiles::StartType;

    struct FailingPower;

    impl PowerPlanAdapter for FailingPower {
        fn active_plan(&self) -> Result<PlanId, PowerError> {
            Err(PowerError::ReadActive("probe down".to_string()))
        }

        fn set_active_plan(&self, _plan: &PlanId) -> Result<(), PowerError> {
            Ok(())
        }
    }

    fn store_in(dir: &TempDir) -> SnapshotStore {
        SnapshotStore::new(dir.path().join("snapshot.json"))
    }

    #[test]
    fn load_returns_none_when_no_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut snapshot = SystemSnapshot::new(PlanId::balanced());
        snapshot.record_service_if_absent("SysMain", StartType::Automatic, true);
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.original_power_plan, Some(PlanId::balanced()));
        assert_eq!(loaded.services, snapshot.services);
    }

    #[test]
    fn clear_removes_the_record_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&SystemSnapshot::new(PlanId::balanced())).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_a_persistence_failure() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(dir.path().join("snapshot.json"), "{ not json").unwrap();

        match store.load() {
            Err(EngineError::Persistence(_)) => {}
            other => panic!("expected a persistence failure, got {:?}", other),
        }
    }

    #[test]
    fn ensure_baseline_captures_once_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let first = store.ensure_baseline(&NoopPowerPlan).unwrap();
        assert_eq!(first.original_power_plan, Some(PlanId::balanced()));
        assert!(store.load().unwrap().is_some());

        // A later call must return the stored baseline, not capture again.
        let mut stored = store.load().unwrap().unwrap();
        stored.record_service_if_absent("WSearch", StartType::Automatic, true);
        store.save(&stored).unwrap();

        let second = store.ensure_baseline(&NoopPowerPlan).unwrap();
        assert_eq!(second.services.len(), 1);
    }

    #[test]
    fn ensure_baseline_falls_back_to_balanced_when_probe_fails() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let snapshot = store.ensure_baseline(&FailingPower).unwrap();
        assert_eq!(snapshot.original_power_plan, Some(PlanId::balanced()));
    }
}
