// src/adapters/power.rs

use std::ptr;

use tracing::debug;
use windows::{
    core::GUID,
    Win32::{
        Foundation::{LocalFree, HLOCAL, WIN32_ERROR},
        System::Power::{PowerGetActiveScheme, PowerSetActiveScheme},
    },
};

use super::PowerPlanAdapter;
use crate::errors::{ElevationError, PowerError};
use crate::profiles::PlanId;
use crate::utils::windows::{is_elevated, run_elevated};

/// Power-plan control through the power management API, falling back to an
/// elevated `powercfg` when the process itself lacks the rights to switch.
pub struct WindowsPowerPlans;

impl PowerPlanAdapter for WindowsPowerPlans {
    fn active_plan(&self) -> Result<PlanId, PowerError> {
        let mut guid_ptr: *mut GUID = ptr::null_mut();
        let status = unsafe { PowerGetActiveScheme(None, &mut guid_ptr) };
        if status != WIN32_ERROR(0) {
            return Err(PowerError::ReadActive(win32_message(status)));
        }
        if guid_ptr.is_null() {
            return Err(PowerError::ReadActive("no scheme returned".to_string()));
        }

        let buffer = SchemeBuffer { ptr: guid_ptr };
        let guid = unsafe { *buffer.ptr };
        Ok(PlanId(format_guid(&guid)))
    }

    fn set_active_plan(&self, plan: &PlanId) -> Result<(), PowerError> {
        let guid = parse_guid(&plan.0)?;

        if is_elevated() {
            debug!("setting power plan {} via the power API", plan);
            let status = unsafe { PowerSetActiveScheme(None, Some(&guid)) };
            if status != WIN32_ERROR(0) {
                return Err(PowerError::Activate(plan.to_string(), win32_message(status)));
            }
            return Ok(());
        }

        // Re-run the switch under UAC; this is where a user can decline.
        debug!("setting power plan {} via elevated powercfg", plan);
        let exit = run_elevated("powercfg", &format!("/setactive {}", plan)).map_err(|e| match e {
            ElevationError::Cancelled => PowerError::ElevationCancelled,
            other => PowerError::Activate(plan.to_string(), other.to_string()),
        })?;
        if exit != 0 {
            return Err(PowerError::Activate(
                plan.to_string(),
                format!("powercfg exited with {}", exit),
            ));
        }
        Ok(())
    }
}

fn win32_message(status: WIN32_ERROR) -> String {
    windows::core::Error::from(status.to_hresult()).to_string()
}

/// Canonical lowercase hyphenated form, the shape persisted in snapshots.
fn format_guid(guid: &GUID) -> String {
    format!(
        "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        guid.data1,
        guid.data2,
        guid.data3,
        guid.data4[0],
        guid.data4[1],
        guid.data4[2],
        guid.data4[3],
        guid.data4[4],
        guid.data4[5],
        guid.data4[6],
        guid.data4[7]
    )
}

/// Accepts the canonical form plus braced and uppercase variants.
fn parse_guid(text: &str) -> Result<GUID, PowerError> {
    let bad = || PowerError::InvalidPlan(text.to_string());

    let trimmed = text.trim().trim_start_matches('{').trim_end_matches('}');
    let parts: Vec<&str> = trimmed.split('-').collect();
    if parts.len() != 5
        || parts[0].len() != 8
        || parts[1].len() != 4
        || parts[2].len() != 4
        || parts[3].len() != 4
        || parts[4].len() != 12
    {
        return Err(bad());
    }

    let data1 = u32::from_str_radix(parts[0], 16).map_err(|_| bad())?;
    let data2 = u16::from_str_radix(parts[1], 16).map_err(|_| bad())?;
    let data3 = u16::from_str_radix(parts[2], 16).map_err(|_| bad())?;

    let tail = format!("{}{}", parts[3], parts[4]);
    let mut data4 = [0u8; 8];
    for (i, byte) in data4.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&tail[i * 2..i * 2 + 2], 16).map_err(|_| bad())?;
    }

    Ok(GUID {
        data1,
        data2,
        data3,
        data4,
    })
}

/// Smart wrapper for the GUID buffer `PowerGetActiveScheme` allocates,
/// ensuring it is handed back to `LocalFree`.
struct SchemeBuffer {
    ptr: *mut GUID,
}

impl Drop for SchemeBuffer {
    fn drop(&mut self) {
        unsafe {
            if !self.ptr.is_null() {
                let free_result = LocalFree(HLOCAL(self.ptr as *mut _));
                if !free_result.is_invalid() {
                    tracing::error!("Failed to free the active scheme buffer");
                }
            }
        }
    }
}
