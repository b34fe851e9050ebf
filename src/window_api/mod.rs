//! Contains logic for extracting the focused window from different environments.
//! [GenericWindowManager] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::sync::Arc;

use anyhow::Result;

/// Process id used to mark a snapshot that doesn't point at a real process. No user facing
/// window is ever owned by pid 0 on either Windows or Linux.
pub const UNRESOLVED_PID: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub process_id: u32,
    /// File name of the executable. For example 'chrome.exe' or 'firefox'
    pub process_name: Arc<str>,
    /// Full path to an executable. For example /usr/lib/firefox/firefox
    pub executable_path: Arc<str>,
    /// Name of the window. For example 'bash in hello' or 'Vibing in YouTube - Chrome'
    pub window_title: Arc<str>,
}

impl WindowSnapshot {
    pub fn unresolved() -> Self {
        Self {
            process_id: UNRESOLVED_PID,
            process_name: "".into(),
            executable_path: "".into(),
            window_title: "".into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.process_id != UNRESOLVED_PID
    }
}

/// Intended to serve as a contract windows and linux systems must implement.
///
/// Implementations own their native handles and must release them on every exit path.
#[cfg_attr(test, mockall::automock)]
pub trait WindowManager: Send {
    fn get_active_window_data(&mut self) -> Result<WindowSnapshot>;
}

/// Serves as a cross-compatible WindowManager implementation.
pub struct GenericWindowManager {
    inner: Box<dyn WindowManager>,
}

impl GenericWindowManager {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowManager;
                Ok(Self {
                    inner: Box::new(WindowsWindowManager::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowManager;
                Ok(Self {
                    inner: Box::new(LinuxWindowManager::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No window backend was enabled at compile time, build with `win` or `x11`"
                ))
            }
        }
    }
}

impl WindowManager for GenericWindowManager {
    fn get_active_window_data(&mut self) -> Result<WindowSnapshot> {
        self.inner.get_active_window_data()
    }
}
