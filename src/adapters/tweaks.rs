// src/adapters/tweaks.rs

use tracing::debug;

use super::TweakAdapter;
use crate::constants::{
    NETWORK_THROTTLING_DEFAULT, NETWORK_THROTTLING_DISABLED, NETWORK_THROTTLING_KEY,
    NETWORK_THROTTLING_VALUE, VISUAL_EFFECTS_DEFAULT, VISUAL_EFFECTS_KEY,
    VISUAL_EFFECTS_PERFORMANCE, VISUAL_EFFECTS_VALUE,
};
use crate::errors::TweakError;
use crate::utils::registry::{set_value, RegistryValue};

/// Registry-backed tunables. Both values take effect for new work without a
/// reboot; Explorer re-reads the visual effects setting on the next theme
/// refresh.
pub struct WindowsTweaks;

impl TweakAdapter for WindowsTweaks {
    fn set_visual_effects(&self, performance: bool) -> Result<(), TweakError> {
        let setting = if performance {
            VISUAL_EFFECTS_PERFORMANCE
        } else {
            VISUAL_EFFECTS_DEFAULT
        };
        set_value(
            VISUAL_EFFECTS_KEY,
            VISUAL_EFFECTS_VALUE,
            &RegistryValue::Dword(setting),
        )
        .map_err(|e| TweakError::Registry(e.to_string()))?;
        debug!("visual effects set to {}", setting);
        Ok(())
    }

    fn set_network_throttling(&self, disabled: bool) -> Result<(), TweakError> {
        let index = if disabled {
            NETWORK_THROTTLING_DISABLED
        } else {
            NETWORK_THROTTLING_DEFAULT
        };
        set_value(
            NETWORK_THROTTLING_KEY,
            NETWORK_THROTTLING_VALUE,
            &RegistryValue::Dword(index),
        )
        .map_err(|e| TweakError::Registry(e.to_string()))?;
        debug!("network throttling index set to {:#x}", index);
        Ok(())
    }
}
