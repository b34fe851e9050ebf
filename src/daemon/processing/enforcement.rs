use std::{sync::Arc, time::Duration};

use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, error, info, instrument};

use crate::error::TrackerError;

use super::policy::Action;

/// Kills processes by id. Implementations are called from a blocking thread.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessTerminator: Send + Sync + 'static {
    fn terminate(&self, pid: u32) -> Result<(), TrackerError>;
}

pub struct SysinfoTerminator;

impl ProcessTerminator for SysinfoTerminator {
    #[instrument(skip(self))]
    fn terminate(&self, pid: u32) -> Result<(), TrackerError> {
        let target = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
        let Some(process) = system.process(target) else {
            return Err(TrackerError::Termination {
                pid,
                reason: "process already exited".into(),
            });
        };
        if process.kill() {
            Ok(())
        } else {
            Err(TrackerError::Termination {
                pid,
                reason: "kill was refused".into(),
            })
        }
    }
}

/// Best-effort executor of [Action]s. The focused window may change before the kill lands, so
/// failures are expected and only logged.
pub struct Enforcer {
    terminator: Arc<dyn ProcessTerminator>,
    timeout: Duration,
}

impl Enforcer {
    pub fn new(terminator: Arc<dyn ProcessTerminator>, timeout: Duration) -> Self {
        Self {
            terminator,
            timeout,
        }
    }

    /// Returns true when a process was actually terminated.
    pub async fn enforce(&self, action: Action) -> bool {
        let Action::Terminate { pid } = action else {
            return false;
        };
        if pid == std::process::id() {
            error!("Refusing to terminate own process {pid}");
            return false;
        }

        let terminator = self.terminator.clone();
        let attempt = tokio::task::spawn_blocking(move || terminator.terminate(pid));
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(Ok(()))) => {
                info!("Terminated process {pid}");
                true
            }
            Ok(Ok(Err(e))) => {
                debug!("{e}");
                false
            }
            Ok(Err(e)) => {
                error!("Termination task for {pid} failed {e:?}");
                false
            }
            Err(_) => {
                debug!("Termination of {pid} timed out after {:?}", self.timeout);
                false
            }
        }
    }
}
