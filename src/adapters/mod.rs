// src/adapters/mod.rs

pub mod noop;
#[cfg(windows)]
pub mod power;
#[cfg(windows)]
pub mod process;
#[cfg(windows)]
pub mod service;
#[cfg(windows)]
pub mod tweaks;
#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use crate::errors::{PowerError, ProcessError, ServiceError, TweakError};
use crate::profiles::{PlanId, StartType};

/// One entry from the service manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub start_type: StartType,
    pub is_running: bool,
}

/// Scheduling priority handed to `reduce_background_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityClass {
    Normal,
    BelowNormal,
    Idle,
}

/// Reads and switches the active power scheme. Switching may require
/// elevation; a declined prompt surfaces as
/// [`PowerError::ElevationCancelled`].
pub trait PowerPlanAdapter: Send + Sync {
    fn active_plan(&self) -> Result<PlanId, PowerError>;
    fn set_active_plan(&self, plan: &PlanId) -> Result<(), PowerError>;
}

/// Controls Windows services through the service manager.
pub trait ServiceAdapter: Send + Sync {
    fn list(&self) -> Result<Vec<ServiceInfo>, ServiceError>;
    fn set_start_type(&self, name: &str, start_type: StartType) -> Result<(), ServiceError>;
    fn start(&self, name: &str) -> Result<(), ServiceError>;
    fn stop(&self, name: &str) -> Result<(), ServiceError>;
}

/// Process-level knobs: scheduling priority, working-set trims and the
/// process-list reads the watcher needs.
pub trait ProcessAdapter: Send + Sync {
    fn reduce_background_priority(&self, class: PriorityClass) -> Result<(), ProcessError>;
    fn optimize_ram(&self) -> Result<(), ProcessError>;

    /// Executable names of everything currently running.
    fn running_processes(&self) -> Result<Vec<String>, ProcessError> {
        Ok(Vec::new())
    }

    /// Terminates every process whose name matches one of `names`; returns
    /// how many were terminated.
    fn kill_processes(&self, _names: &[String]) -> Result<usize, ProcessError> {
        Ok(0)
    }
}

/// Registry-level tunables that have no service of their own.
pub trait TweakAdapter: Send + Sync {
    fn set_visual_effects(&self, performance: bool) -> Result<(), TweakError>;
    fn set_network_throttling(&self, disabled: bool) -> Result<(), TweakError>;
}

/// The four subsystem boundaries the engine drives, bundled for wiring.
#[derive(Clone)]
pub struct AdapterSet {
    pub power: Arc<dyn PowerPlanAdapter>,
    pub services: Arc<dyn ServiceAdapter>,
    pub processes: Arc<dyn ProcessAdapter>,
    pub tweaks: Arc<dyn TweakAdapter>,
}

impl AdapterSet {
    /// Adapters that acknowledge every call without touching the host. Used
    /// when a deployment lacks a subsystem, and as the non-Windows fallback.
    pub fn noop() -> Self {
        Self {
            power: Arc::new(noop::NoopPowerPlan),
            services: Arc::new(noop::NoopServices),
            processes: Arc::new(noop::NoopProcesses),
            tweaks: Arc::new(noop::NoopTweaks),
        }
    }
}
