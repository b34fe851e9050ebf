use std::path::Path;

use anyhow::{Result, anyhow};
use tracing::{error, instrument};
use windows::{
    Win32::{
        Foundation::{BOOL, CloseHandle, HANDLE, HWND},
        System::Threading::{
            OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
            QueryFullProcessImageNameW,
        },
        UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
    },
    core::PWSTR,
};

use super::{UNRESOLVED_PID, WindowManager, WindowSnapshot};

/// Owns a process handle for the duration of a single query. The handle is closed on drop, so
/// early returns on failed lookups never leak it.
struct ProcessHandle(HANDLE);

impl ProcessHandle {
    fn open(pid: u32) -> Result<Self> {
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), pid) }
            .map_err(|e| anyhow!("Failed to open process {pid}: {e}"))?;
        Ok(Self(handle))
    }

    fn executable_path(&self, text: &mut [u16]) -> Result<String> {
        let mut length = text.len() as u32;
        unsafe {
            QueryFullProcessImageNameW(
                self.0,
                PROCESS_NAME_WIN32,
                PWSTR(text.as_mut_ptr()),
                &mut length,
            )?;
        }
        Ok(String::from_utf16_lossy(&text[..length as usize]))
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Err(e) = unsafe { CloseHandle(self.0) } {
            error!("Failed to close handle {e:?}");
        }
    }
}

#[instrument]
pub fn get_active() -> Result<WindowSnapshot> {
    let window = unsafe { GetForegroundWindow() };

    if window.is_invalid() {
        return Err(anyhow!("Failed to get foreground window"));
    }

    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(window, Some(&mut pid)) };
    if pid == UNRESOLVED_PID {
        return Err(anyhow!(
            "Failed to get owner of active window {}",
            windows::core::Error::from_win32()
        ));
    }

    let mut text: [u16; 4096] = [0; 4096];
    let executable_path = {
        let process = ProcessHandle::open(pid)?;
        process.executable_path(&mut text)?
    };
    let title = unsafe { get_window_title(window, &mut text) };

    let process_name = Path::new(&executable_path)
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| executable_path.clone());

    Ok(WindowSnapshot {
        process_id: pid,
        process_name: process_name.into(),
        executable_path: executable_path.into(),
        window_title: title.into(),
    })
}

unsafe fn get_window_title(window_handle: HWND, text: &mut [u16]) -> String {
    let len = unsafe { GetWindowTextW(window_handle, text) };
    String::from_utf16_lossy(&text[..len.max(0) as usize])
}

pub struct WindowsWindowManager {}

impl WindowsWindowManager {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsWindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager for WindowsWindowManager {
    fn get_active_window_data(&mut self) -> Result<WindowSnapshot> {
        get_active()
    }
}
