// src/utils/windows.rs

use tracing::debug;
use widestring::{u16cstr, U16CString};
use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{CloseHandle, ERROR_CANCELLED, HANDLE, WAIT_OBJECT_0},
        Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY},
        System::Threading::{
            GetCurrentProcess, GetExitCodeProcess, OpenProcessToken, WaitForSingleObject, INFINITE,
        },
        UI::{
            Shell::{ShellExecuteExW, SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW},
            WindowsAndMessaging::SW_HIDE,
        },
    },
};

use crate::errors::ElevationError;

/// Whether the current process token carries administrator rights.
pub fn is_elevated() -> bool {
    let mut token = HANDLE::default();
    if unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) }.is_err() {
        return false;
    }

    let mut elevation = TOKEN_ELEVATION::default();
    let mut returned = 0u32;
    let queried = unsafe {
        GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut _),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut returned,
        )
    };
    unsafe {
        let _ = CloseHandle(token);
    }
    queried.is_ok() && elevation.TokenIsElevated != 0
}

/// Launches `program parameters` through the UAC consent prompt, waits for it
/// to finish and returns its exit code. Declining the prompt maps to
/// [`ElevationError::Cancelled`].
pub fn run_elevated(program: &str, parameters: &str) -> Result<u32, ElevationError> {
    let launch_err =
        |detail: String| ElevationError::Launch(program.to_string(), detail);

    let program_w = U16CString::from_str(program).map_err(|e| launch_err(e.to_string()))?;
    let parameters_w = U16CString::from_str(parameters).map_err(|e| launch_err(e.to_string()))?;
    let verb = u16cstr!("runas");

    let mut info = SHELLEXECUTEINFOW {
        cbSize: std::mem::size_of::<SHELLEXECUTEINFOW>() as u32,
        fMask: SEE_MASK_NOCLOSEPROCESS,
        lpVerb: PCWSTR(verb.as_ptr()),
        lpFile: PCWSTR(program_w.as_ptr()),
        lpParameters: PCWSTR(parameters_w.as_ptr()),
        nShow: SW_HIDE.0,
        ..Default::default()
    };

    debug!("launching elevated: {} {}", program, parameters);
    if let Err(e) = unsafe { ShellExecuteExW(&mut info) } {
        if e.code() == ERROR_CANCELLED.to_hresult() {
            return Err(ElevationError::Cancelled);
        }
        return Err(launch_err(e.to_string()));
    }

    let process = info.hProcess;
    if process.is_invalid() {
        return Err(launch_err("no process handle returned".to_string()));
    }

    unsafe {
        if WaitForSingleObject(process, INFINITE) != WAIT_OBJECT_0 {
            let _ = CloseHandle(process);
            return Err(launch_err("wait for exit failed".to_string()));
        }
        let mut code = 0u32;
        let queried = GetExitCodeProcess(process, &mut code);
        let _ = CloseHandle(process);
        queried.map_err(|e| launch_err(e.to_string()))?;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_probe_does_not_crash() {
        println!("Is elevated: {}", is_elevated());
    }
}
