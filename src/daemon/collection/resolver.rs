use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tracing::warn;

use crate::{
    error::TrackerError,
    window_api::{WindowManager, WindowSnapshot},
};

/// Runs window queries on a blocking thread with an upper bound on how long a tick waits. A query
/// that outlives its timeout keeps the manager busy and the following ticks resolve nothing until
/// it returns.
pub struct WindowResolver {
    manager: Arc<Mutex<Box<dyn WindowManager>>>,
    timeout: Duration,
}

impl WindowResolver {
    pub fn new(manager: Box<dyn WindowManager>, timeout: Duration) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
            timeout,
        }
    }

    /// Returns the focused window, `None` when it can't be determined right now.
    pub async fn resolve(&self) -> Option<WindowSnapshot> {
        match self.query().await {
            Ok(snapshot) if snapshot.is_resolved() => Some(snapshot),
            Ok(snapshot) => {
                warn!("Window manager returned an unresolved snapshot {snapshot:?}");
                None
            }
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }

    async fn query(&self) -> Result<WindowSnapshot, TrackerError> {
        let manager = self.manager.clone();
        let query = tokio::task::spawn_blocking(move || {
            let mut manager = manager.try_lock().map_err(|_| {
                TrackerError::Resolution("previous window query is still running".into())
            })?;
            manager
                .get_active_window_data()
                .map_err(|e| TrackerError::Resolution(format!("{e:#}")))
        });

        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(TrackerError::Resolution(format!("window query failed {e}"))),
            Err(_) => Err(TrackerError::Resolution(format!(
                "window query timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use crate::window_api::MockWindowManager;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn chrome() -> WindowSnapshot {
        WindowSnapshot {
            process_id: 100,
            process_name: "chrome.exe".into(),
            executable_path: "C:\\chrome.exe".into(),
            window_title: "YouTube - Chrome".into(),
        }
    }

    #[tokio::test]
    async fn test_resolves_snapshot() {
        let mut manager = MockWindowManager::new();
        manager
            .expect_get_active_window_data()
            .returning(|| Ok(chrome()));
        let resolver = WindowResolver::new(Box::new(manager), TIMEOUT);

        assert_eq!(resolver.resolve().await, Some(chrome()));
    }

    #[tokio::test]
    async fn test_os_failure_is_unresolved() {
        let mut manager = MockWindowManager::new();
        manager
            .expect_get_active_window_data()
            .returning(|| Err(anyhow!("access denied")));
        let resolver = WindowResolver::new(Box::new(manager), TIMEOUT);

        assert_eq!(resolver.resolve().await, None);
    }

    #[tokio::test]
    async fn test_sentinel_pid_is_unresolved() {
        let mut manager = MockWindowManager::new();
        manager
            .expect_get_active_window_data()
            .returning(|| Ok(WindowSnapshot::unresolved()));
        let resolver = WindowResolver::new(Box::new(manager), TIMEOUT);

        assert_eq!(resolver.resolve().await, None);
    }

    #[tokio::test]
    async fn test_hung_query_times_out() {
        let mut manager = MockWindowManager::new();
        manager.expect_get_active_window_data().returning(|| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(chrome())
        });
        let resolver = WindowResolver::new(Box::new(manager), Duration::from_millis(20));

        assert_eq!(resolver.resolve().await, None);
        // The first query still holds the manager.
        assert_eq!(resolver.resolve().await, None);
    }
}
