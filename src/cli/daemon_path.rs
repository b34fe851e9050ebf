use std::path::PathBuf;

const DAEMON_BINARY_NAME: &str = "usage-warden-daemon";

/// Daemon binary installed next to the cli executable at `path`.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name(DAEMON_BINARY_NAME);
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
