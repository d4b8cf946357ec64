// src/adapters/service.rs

use std::{
    thread,
    time::{Duration, Instant},
};

use tracing::debug;
use windows::{
    core::{HSTRING, PCWSTR},
    Win32::{
        Foundation::ERROR_SERVICE_NOT_ACTIVE,
        System::Services::{
            ChangeServiceConfigW, CloseServiceHandle, ControlService, EnumServicesStatusExW,
            OpenSCManagerW, OpenServiceW, QueryServiceConfigW, QueryServiceStatus, StartServiceW,
            ENUM_SERVICE_STATUS_PROCESSW, ENUM_SERVICE_TYPE, QUERY_SERVICE_CONFIGW,
            SC_ENUM_PROCESS_INFO, SC_HANDLE, SC_MANAGER_CONNECT, SC_MANAGER_ENUMERATE_SERVICE,
            SERVICE_AUTO_START, SERVICE_CHANGE_CONFIG, SERVICE_CONTROL_STOP, SERVICE_DEMAND_START,
            SERVICE_DISABLED, SERVICE_ERROR, SERVICE_NO_CHANGE, SERVICE_QUERY_CONFIG,
            SERVICE_QUERY_STATUS, SERVICE_RUNNING, SERVICE_START, SERVICE_START_TYPE,
            SERVICE_STATE_ALL, SERVICE_STATUS, SERVICE_STOP, SERVICE_STOPPED, SERVICE_WIN32,
        },
    },
};

use super::{ServiceAdapter, ServiceInfo};
use crate::errors::ServiceError;
use crate::profiles::StartType;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(250);
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Service control through the service manager. Stops wait for the service
/// to actually reach the stopped state so a following restore sees the truth.
pub struct WindowsServices;

/// Closes a service manager handle when dropped.
struct ScHandle(SC_HANDLE);

impl Drop for ScHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseServiceHandle(self.0);
        }
    }
}

impl WindowsServices {
    fn manager(access: u32) -> Result<ScHandle, ServiceError> {
        let scm = unsafe { OpenSCManagerW(None, None, access) }
            .map_err(|e| ServiceError::ManagerUnavailable(e.to_string()))?;
        Ok(ScHandle(scm))
    }

    fn open(scm: &ScHandle, name: &str, access: u32) -> Result<ScHandle, ServiceError> {
        let name_w = HSTRING::from(name);
        let service = unsafe { OpenServiceW(scm.0, PCWSTR(name_w.as_ptr()), access) }
            .map_err(|e| ServiceError::OpenFailed(name.to_string(), e.to_string()))?;
        Ok(ScHandle(service))
    }

    fn query_state(service: &ScHandle, name: &str) -> Result<SERVICE_STATUS, ServiceError> {
        let mut status = SERVICE_STATUS::default();
        unsafe { QueryServiceStatus(service.0, &mut status) }
            .map_err(|e| ServiceError::QueryFailed(name.to_string(), e.to_string()))?;
        Ok(status)
    }

    fn query_start_type(scm: &ScHandle, name: &str) -> Result<StartType, ServiceError> {
        let service = Self::open(scm, name, SERVICE_QUERY_CONFIG)?;

        // First call sizes the buffer; ERROR_INSUFFICIENT_BUFFER is expected.
        let mut needed = 0u32;
        let _ = unsafe { QueryServiceConfigW(service.0, None, 0, &mut needed) };
        if needed == 0 {
            return Err(ServiceError::QueryFailed(
                name.to_string(),
                "config size query returned nothing".to_string(),
            ));
        }

        let mut buffer = vec![0u8; needed as usize];
        unsafe {
            QueryServiceConfigW(
                service.0,
                Some(buffer.as_mut_ptr() as *mut QUERY_SERVICE_CONFIGW),
                needed,
                &mut needed,
            )
        }
        .map_err(|e| ServiceError::QueryFailed(name.to_string(), e.to_string()))?;

        // The byte buffer carries no alignment guarantee, so copy the record
        // out instead of referencing into it.
        let config =
            unsafe { std::ptr::read_unaligned(buffer.as_ptr() as *const QUERY_SERVICE_CONFIGW) };
        Ok(start_type_from(config.dwStartType))
    }
}

impl ServiceAdapter for WindowsServices {
    fn list(&self) -> Result<Vec<ServiceInfo>, ServiceError> {
        let scm = Self::manager(SC_MANAGER_CONNECT | SC_MANAGER_ENUMERATE_SERVICE)?;

        // First call sizes the buffer; ERROR_MORE_DATA is expected.
        let mut bytes_needed = 0u32;
        let mut count = 0u32;
        let mut resume = 0u32;
        let _ = unsafe {
            EnumServicesStatusExW(
                scm.0,
                SC_ENUM_PROCESS_INFO,
                SERVICE_WIN32,
                SERVICE_STATE_ALL,
                None,
                &mut bytes_needed,
                &mut count,
                Some(&mut resume),
                None,
            )
        };
        if bytes_needed == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; bytes_needed as usize];
        resume = 0;
        unsafe {
            EnumServicesStatusExW(
                scm.0,
                SC_ENUM_PROCESS_INFO,
                SERVICE_WIN32,
                SERVICE_STATE_ALL,
                Some(buffer.as_mut_slice()),
                &mut bytes_needed,
                &mut count,
                Some(&mut resume),
                None,
            )
        }
        .map_err(|e| ServiceError::ManagerUnavailable(e.to_string()))?;

        // Same alignment caveat as the config query: the records sit in a
        // byte buffer, so each one is copied out rather than sliced over.
        // The name and display pointers inside a copy still point into
        // `buffer`, which outlives the loop.
        let base = buffer.as_ptr() as *const ENUM_SERVICE_STATUS_PROCESSW;

        let mut services = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let record = unsafe { std::ptr::read_unaligned(base.add(i)) };
            let name = match unsafe { record.lpServiceName.to_string() } {
                Ok(name) => name,
                Err(_) => continue,
            };
            let is_running = record.ServiceStatusProcess.dwCurrentState == SERVICE_RUNNING;
            let start_type = match Self::query_start_type(&scm, &name) {
                Ok(start_type) => start_type,
                Err(e) => {
                    debug!("skipping '{}': {}", name, e);
                    continue;
                }
            };
            services.push(ServiceInfo {
                name,
                start_type,
                is_running,
            });
        }
        Ok(services)
    }

    fn set_start_type(&self, name: &str, start_type: StartType) -> Result<(), ServiceError> {
        let scm = Self::manager(SC_MANAGER_CONNECT)?;
        let service = Self::open(&scm, name, SERVICE_CHANGE_CONFIG)?;
        unsafe {
            ChangeServiceConfigW(
                service.0,
                ENUM_SERVICE_TYPE(SERVICE_NO_CHANGE),
                start_type_to(start_type),
                SERVICE_ERROR(SERVICE_NO_CHANGE),
                None,
                None,
                None,
                None,
                None,
                None,
                None,
            )
        }
        .map_err(|e| ServiceError::ConfigFailed(name.to_string(), e.to_string()))?;
        debug!("'{}' start type set to {:?}", name, start_type);
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), ServiceError> {
        let scm = Self::manager(SC_MANAGER_CONNECT)?;
        let service = Self::open(&scm, name, SERVICE_START | SERVICE_QUERY_STATUS)?;

        if Self::query_state(&service, name)?.dwCurrentState == SERVICE_RUNNING {
            return Ok(());
        }
        unsafe { StartServiceW(service.0, None) }
            .map_err(|e| ServiceError::ControlFailed(name.to_string(), e.to_string()))?;
        debug!("'{}' started", name);
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), ServiceError> {
        let scm = Self::manager(SC_MANAGER_CONNECT)?;
        let service = Self::open(&scm, name, SERVICE_STOP | SERVICE_QUERY_STATUS)?;

        if Self::query_state(&service, name)?.dwCurrentState == SERVICE_STOPPED {
            return Ok(());
        }

        let mut control_status = SERVICE_STATUS::default();
        if let Err(e) =
            unsafe { ControlService(service.0, SERVICE_CONTROL_STOP, &mut control_status) }
        {
            if e.code() == ERROR_SERVICE_NOT_ACTIVE.to_hresult() {
                return Ok(());
            }
            return Err(ServiceError::ControlFailed(name.to_string(), e.to_string()));
        }

        // Bounded wait for the stop to land; restores check the real state.
        let deadline = Instant::now() + STOP_TIMEOUT;
        loop {
            if Self::query_state(&service, name)?.dwCurrentState == SERVICE_STOPPED {
                debug!("'{}' stopped", name);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ServiceError::ControlFailed(
                    name.to_string(),
                    format!("did not stop within {:?}", STOP_TIMEOUT),
                ));
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }
    }
}

fn start_type_from(raw: SERVICE_START_TYPE) -> StartType {
    if raw == SERVICE_DEMAND_START {
        StartType::Manual
    } else if raw == SERVICE_DISABLED {
        StartType::Disabled
    } else {
        // auto start plus the boot and system driver start kinds
        StartType::Automatic
    }
}

fn start_type_to(start_type: StartType) -> SERVICE_START_TYPE {
    match start_type {
        StartType::Automatic => SERVICE_AUTO_START,
        StartType::Manual => SERVICE_DEMAND_START,
        StartType::Disabled => SERVICE_DISABLED,
    }
}
