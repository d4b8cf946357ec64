// src/profiles/mod.rs

pub mod applier;
pub mod catalog;
pub mod snapshot;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::constants::BALANCED_PLAN;

/// The closed set of profiles the engine knows about.
///
/// `General` is the distinguished "no profile" state: applying it restores the
/// baseline, and it is never itself recorded in a snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ProfileMode {
    General,
    Gamer,
    Developer,
    Office,
    Custom,
}

/// Power plan identifier, a GUID in `powercfg` notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn balanced() -> Self {
        PlanId(BALANCED_PLAN.to_string())
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlanId {
    fn from(value: &str) -> Self {
        PlanId(value.to_string())
    }
}

/// Service start type as reported by the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartType {
    Automatic,
    Manual,
    Disabled,
}

/// Everything one profile changes on the host.
///
/// Unset fields deserialize to their defaults, so a persisted override may
/// name only the fields it cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileConfig {
    pub mode: ProfileMode,
    pub services_to_stop: Vec<String>,
    pub disable_telemetry: bool,
    pub disable_indexing: bool,
    pub pause_windows_update: bool,
    pub reduce_background_priority: bool,
    pub auto_clean_ram: bool,
    pub processes_to_kill: Vec<String>,
    pub optimize_visual_effects: bool,
    pub disable_network_throttling: bool,
    pub power_plan_guid: PlanId,
    pub auto_boost_processes: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            mode: ProfileMode::General,
            services_to_stop: Vec::new(),
            disable_telemetry: false,
            disable_indexing: false,
            pause_windows_update: false,
            reduce_background_priority: false,
            auto_clean_ram: false,
            processes_to_kill: Vec::new(),
            optimize_visual_effects: false,
            disable_network_throttling: false,
            power_plan_guid: PlanId::balanced(),
            auto_boost_processes: Vec::new(),
        }
    }
}

impl ProfileConfig {
    /// A profile that changes nothing beyond activating the balanced plan.
    pub fn inert(mode: ProfileMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// A service's state as first observed, before any profile touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStateSnapshot {
    pub start_type: StartType,
    pub was_running: bool,
}

/// The single durable baseline for the current non-General session.
///
/// Its existence is the only evidence that the machine is under profile
/// influence. The service map preserves first-touched order and a service is
/// recorded at most once per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub original_power_plan: Option<PlanId>,
    #[serde(default)]
    pub services: IndexMap<String, ServiceStateSnapshot>,
}

impl SystemSnapshot {
    pub fn new(original_power_plan: PlanId) -> Self {
        Self {
            original_power_plan: Some(original_power_plan),
            services: IndexMap::new(),
        }
    }

    /// Records a service baseline unless one is already present.
    ///
    /// Returns `true` when an insertion happened, which is the caller's signal
    /// that the snapshot must be persisted again. An existing entry is never
    /// overwritten: the state captured by the first profile that touched the
    /// service stays authoritative until the next restore.
    pub fn record_service_if_absent(
        &mut self,
        name: &str,
        start_type: StartType,
        was_running: bool,
    ) -> bool {
        if self.services.contains_key(name) {
            return false;
        }
        self.services.insert(
            name.to_string(),
            ServiceStateSnapshot {
                start_type,
                was_running,
            },
        );
        true
    }
}

/// One best-effort group in an apply/restore run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProfileStep {
    #[strum(serialize = "power plan")]
    PowerPlan,
    #[strum(serialize = "background priority")]
    BackgroundPriority,
    #[strum(serialize = "services")]
    Services,
    #[strum(serialize = "memory clean")]
    MemoryClean,
    #[strum(serialize = "visual effects")]
    VisualEffects,
    #[strum(serialize = "update pause")]
    UpdatePause,
    #[strum(serialize = "network throttling")]
    NetworkThrottling,
    #[strum(serialize = "telemetry")]
    Telemetry,
    #[strum(serialize = "indexing")]
    Indexing,
}

/// Outcome of one step, kept for reporting; never changes the authoritative
/// result.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: ProfileStep,
    /// Service or process the step acted on, when it acted on exactly one.
    pub subject: Option<String>,
    pub outcome: Result<(), String>,
}

impl StepReport {
    pub fn ok(step: ProfileStep) -> Self {
        Self {
            step,
            subject: None,
            outcome: Ok(()),
        }
    }

    pub fn failed(step: ProfileStep, error: String) -> Self {
        Self {
            step,
            subject: None,
            outcome: Err(error),
        }
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.subject, &self.outcome) {
            (Some(subject), Ok(())) => write!(f, "{} ({}): ok", self.step, subject),
            (Some(subject), Err(e)) => write!(f, "{} ({}): {}", self.step, subject, e),
            (None, Ok(())) => write!(f, "{}: ok", self.step),
            (None, Err(e)) => write!(f, "{}: {}", self.step, e),
        }
    }
}

/// Result of the authoritative power-plan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub success: bool,
    /// Set when the user declined the elevation prompt. A declined prompt is
    /// a recoverable user choice, reported distinctly from real failures.
    pub cancelled: bool,
    pub message: String,
}

impl ApplyOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            cancelled: false,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            cancelled: false,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            success: false,
            cancelled: true,
            message: "Power plan change cancelled by the user".to_string(),
        }
    }
}

/// Aggregate result of one Apply or Restore run.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub mode: ProfileMode,
    pub outcome: ApplyOutcome,
    pub steps: Vec<StepReport>,
}
