// src/errors.rs

use thiserror::Error;

/// Failure taxonomy for the apply/restore engine.
///
/// Only `Persistence` and `Unexpected` abort an operation; elevation refusals
/// surface through the authoritative step outcome and adapter problems are
/// logged and skipped.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Cancelled by the user at the elevation prompt")]
    ElevationCancelled,

    #[error("Subsystem unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("Failed to persist engine state: {0}")]
    Persistence(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

#[derive(Error, Debug)]
pub enum PowerError {
    #[error("Elevation prompt declined")]
    ElevationCancelled,

    #[error("Failed to read the active power plan: {0}")]
    ReadActive(String),

    #[error("Failed to activate power plan '{0}': {1}")]
    Activate(String, String),

    #[error("Invalid power plan identifier: {0}")]
    InvalidPlan(String),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to connect to the service manager: {0}")]
    ManagerUnavailable(String),

    #[error("Failed to open service '{0}': {1}")]
    OpenFailed(String, String),

    #[error("Failed to query service '{0}': {1}")]
    QueryFailed(String, String),

    #[error("Failed to reconfigure service '{0}': {1}")]
    ConfigFailed(String, String),

    #[error("Failed to control service '{0}': {1}")]
    ControlFailed(String, String),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to snapshot running processes: {0}")]
    SnapshotFailed(String),

    #[error("Failed to adjust process priorities: {0}")]
    PriorityFailed(String),

    #[error("Failed to trim process working sets: {0}")]
    TrimFailed(String),
}

#[derive(Error, Debug)]
pub enum TweakError {
    #[error("Registry update failed: {0}")]
    Registry(String),
}

/// Raised by the elevated-launch helper. A declined consent prompt is kept
/// apart from real launch failures so callers can report it as a user choice.
#[derive(Error, Debug)]
pub enum ElevationError {
    #[error("Cancelled by the user at the elevation prompt")]
    Cancelled,

    #[error("Elevated launch of '{0}' failed: {1}")]
    Launch(String, String),
}

impl From<PowerError> for EngineError {
    fn from(err: PowerError) -> Self {
        match err {
            PowerError::ElevationCancelled => EngineError::ElevationCancelled,
            other => EngineError::AdapterUnavailable(other.to_string()),
        }
    }
}

impl From<ServiceError> for EngineError {
    fn from(err: ServiceError) -> Self {
        EngineError::AdapterUnavailable(err.to_string())
    }
}

impl From<ProcessError> for EngineError {
    fn from(err: ProcessError) -> Self {
        EngineError::AdapterUnavailable(err.to_string())
    }
}

impl From<TweakError> for EngineError {
    fn from(err: TweakError) -> Self {
        EngineError::AdapterUnavailable(err.to_string())
    }
}
