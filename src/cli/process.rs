use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{Result, anyhow};
use sysinfo::{ProcessesToUpdate, Signal, System, get_current_pid};
use tracing::info;

use super::daemon_path::to_daemon_path;

/// Stops every process running the executable at `name`, except the current one and its
/// children. Returns the number of processes stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            info!("Stopped daemon {pid}");
            stopped += 1;
        }
    }
    Ok(stopped)
}

fn daemon_executable() -> Result<PathBuf> {
    Ok(to_daemon_path(std::env::current_exe()?))
}

/// Stops running daemons of this installation.
pub fn stop_servers() -> Result<usize> {
    kill_previous_servers(&daemon_executable()?)
}

/// Shuts down previous daemons and starts a new one. The daemon binary detaches itself, this
/// process only waits for the launcher.
pub fn restart_server(dir: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let daemon = daemon_executable()?;
    kill_previous_servers(&daemon)?;

    let mut command = std::process::Command::new(&daemon);
    if let Some(dir) = dir {
        command.arg("--dir").arg(std::path::absolute(dir)?);
    }
    if let Some(config) = config {
        command.arg("--config").arg(std::path::absolute(config)?);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    println!("Spawning {daemon:?}");
    let status = command.status()?;
    if !status.success() {
        return Err(anyhow!("Daemon launcher exited with {status}"));
    }
    println!("Success");
    Ok(())
}
