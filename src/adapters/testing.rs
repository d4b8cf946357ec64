// src/adapters/testing.rs

//! In-memory adapters for engine and watcher tests. Every mutating call is
//! appended to a shared [`CallLog`] so tests can assert on exactly what ran,
//! and in which order.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use super::{
    AdapterSet, PowerPlanAdapter, PriorityClass, ProcessAdapter, ServiceAdapter, ServiceInfo,
    TweakAdapter,
};
use crate::errors::{PowerError, ProcessError, ServiceError, TweakError};
use crate::profiles::{PlanId, StartType};

#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn push(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }

    /// Returns everything logged so far and resets the log.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

pub struct MockPower {
    active: Mutex<PlanId>,
    fail_next: Mutex<Option<PowerError>>,
    log: Arc<CallLog>,
}

impl MockPower {
    pub fn new(active: &str, log: Arc<CallLog>) -> Self {
        Self {
            active: Mutex::new(PlanId::from(active)),
            fail_next: Mutex::new(None),
            log,
        }
    }

    pub fn current(&self) -> PlanId {
        self.active.lock().unwrap().clone()
    }

    /// Makes the next `set_active_plan` call fail with `err`.
    pub fn fail_next(&self, err: PowerError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }
}

impl PowerPlanAdapter for MockPower {
    fn active_plan(&self) -> Result<PlanId, PowerError> {
        Ok(self.current())
    }

    fn set_active_plan(&self, plan: &PlanId) -> Result<(), PowerError> {
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        self.log.push(format!("power.set {}", plan));
        *self.active.lock().unwrap() = plan.clone();
        Ok(())
    }
}

pub struct MockServices {
    table: Mutex<IndexMap<String, (StartType, bool)>>,
    log: Arc<CallLog>,
}

impl MockServices {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            table: Mutex::new(IndexMap::new()),
            log,
        }
    }

    pub fn insert(&self, name: &str, start_type: StartType, running: bool) {
        self.table
            .lock()
            .unwrap()
            .insert(name.to_string(), (start_type, running));
    }

    pub fn state(&self, name: &str) -> Option<(StartType, bool)> {
        self.table.lock().unwrap().get(name).copied()
    }

    fn missing(name: &str) -> ServiceError {
        ServiceError::OpenFailed(name.to_string(), "not installed".to_string())
    }
}

impl ServiceAdapter for MockServices {
    fn list(&self) -> Result<Vec<ServiceInfo>, ServiceError> {
        Ok(self
            .table
            .lock()
            .unwrap()
            .iter()
            .map(|(name, (start_type, running))| ServiceInfo {
                name: name.clone(),
                start_type: *start_type,
                is_running: *running,
            })
            .collect())
    }

    fn set_start_type(&self, name: &str, start_type: StartType) -> Result<(), ServiceError> {
        let mut table = self.table.lock().unwrap();
        let entry = table.get_mut(name).ok_or_else(|| Self::missing(name))?;
        entry.0 = start_type;
        self.log.push(format!("svc.config {} {:?}", name, start_type));
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), ServiceError> {
        let mut table = self.table.lock().unwrap();
        let entry = table.get_mut(name).ok_or_else(|| Self::missing(name))?;
        entry.1 = true;
        self.log.push(format!("svc.start {}", name));
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), ServiceError> {
        let mut table = self.table.lock().unwrap();
        let entry = table.get_mut(name).ok_or_else(|| Self::missing(name))?;
        entry.1 = false;
        self.log.push(format!("svc.stop {}", name));
        Ok(())
    }
}

pub struct MockProcesses {
    running: Mutex<Vec<String>>,
    log: Arc<CallLog>,
}

impl MockProcesses {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            running: Mutex::new(Vec::new()),
            log,
        }
    }

    /// Replaces the simulated process list.
    pub fn set_running(&self, names: &[&str]) {
        *self.running.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
    }
}

impl ProcessAdapter for MockProcesses {
    fn reduce_background_priority(&self, class: PriorityClass) -> Result<(), ProcessError> {
        self.log.push(format!("proc.priority {:?}", class));
        Ok(())
    }

    fn optimize_ram(&self) -> Result<(), ProcessError> {
        self.log.push("proc.trim".to_string());
        Ok(())
    }

    fn running_processes(&self) -> Result<Vec<String>, ProcessError> {
        Ok(self.running.lock().unwrap().clone())
    }

    fn kill_processes(&self, names: &[String]) -> Result<usize, ProcessError> {
        // Same tolerance as the real adapter: case and a trailing ".exe" on
        // either side do not matter.
        fn stem(name: &str) -> String {
            let lower = name.to_ascii_lowercase();
            lower
                .strip_suffix(".exe")
                .map(|s| s.to_string())
                .unwrap_or(lower)
        }
        let mut running = self.running.lock().unwrap();
        let before = running.len();
        running.retain(|candidate| {
            let keep = !names.iter().any(|target| stem(candidate) == stem(target));
            if !keep {
                self.log.push(format!("proc.kill {}", candidate));
            }
            keep
        });
        Ok(before - running.len())
    }
}

pub struct MockTweaks {
    log: Arc<CallLog>,
}

impl MockTweaks {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self { log }
    }
}

impl TweakAdapter for MockTweaks {
    fn set_visual_effects(&self, performance: bool) -> Result<(), TweakError> {
        self.log.push(format!("tweak.visual {}", performance));
        Ok(())
    }

    fn set_network_throttling(&self, disabled: bool) -> Result<(), TweakError> {
        self.log.push(format!("tweak.throttle {}", disabled));
        Ok(())
    }
}

/// Typed handles into the mocks behind an [`AdapterSet`].
pub struct MockHandles {
    pub power: Arc<MockPower>,
    pub services: Arc<MockServices>,
    pub processes: Arc<MockProcesses>,
    pub tweaks: Arc<MockTweaks>,
    pub log: Arc<CallLog>,
}

/// Builds an adapter set over fresh mocks with `initial_plan` active and no
/// services installed.
pub fn mock_adapters(initial_plan: &str) -> (AdapterSet, MockHandles) {
    let log = Arc::new(CallLog::default());
    let power = Arc::new(MockPower::new(initial_plan, log.clone()));
    let services = Arc::new(MockServices::new(log.clone()));
    let processes = Arc::new(MockProcesses::new(log.clone()));
    let tweaks = Arc::new(MockTweaks::new(log.clone()));

    let set = AdapterSet {
        power: power.clone(),
        services: services.clone(),
        processes: processes.clone(),
        tweaks: tweaks.clone(),
    };
    let handles = MockHandles {
        power,
        services,
        processes,
        tweaks,
        log,
    };
    (set, handles)
}
