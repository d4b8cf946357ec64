// src/adapters/noop.rs

use tracing::debug;

use super::{PowerPlanAdapter, PriorityClass, ProcessAdapter, ServiceAdapter, TweakAdapter};
use crate::errors::{PowerError, ProcessError, ServiceError, TweakError};
use crate::profiles::{PlanId, StartType};

/// Answers with the balanced plan and accepts any switch without acting.
pub struct NoopPowerPlan;

impl PowerPlanAdapter for NoopPowerPlan {
    fn active_plan(&self) -> Result<PlanId, PowerError> {
        Ok(PlanId::balanced())
    }

    fn set_active_plan(&self, plan: &PlanId) -> Result<(), PowerError> {
        debug!("power adapter absent, not switching to {}", plan);
        Ok(())
    }
}

/// Reports an empty service table and acknowledges every control call.
pub struct NoopServices;

impl ServiceAdapter for NoopServices {
    fn list(&self) -> Result<Vec<super::ServiceInfo>, ServiceError> {
        Ok(Vec::new())
    }

    fn set_start_type(&self, name: &str, _start_type: StartType) -> Result<(), ServiceError> {
        debug!("service adapter absent, not reconfiguring '{}'", name);
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), ServiceError> {
        debug!("service adapter absent, not starting '{}'", name);
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), ServiceError> {
        debug!("service adapter absent, not stopping '{}'", name);
        Ok(())
    }
}

pub struct NoopProcesses;

impl ProcessAdapter for NoopProcesses {
    fn reduce_background_priority(&self, class: PriorityClass) -> Result<(), ProcessError> {
        debug!("process adapter absent, not applying {:?} priority", class);
        Ok(())
    }

    fn optimize_ram(&self) -> Result<(), ProcessError> {
        debug!("process adapter absent, not trimming working sets");
        Ok(())
    }
}

pub struct NoopTweaks;

impl TweakAdapter for NoopTweaks {
    fn set_visual_effects(&self, performance: bool) -> Result<(), TweakError> {
        debug!("tweak adapter absent, not setting visual effects ({})", performance);
        Ok(())
    }

    fn set_network_throttling(&self, disabled: bool) -> Result<(), TweakError> {
        debug!("tweak adapter absent, not setting throttling ({})", disabled);
        Ok(())
    }
}
