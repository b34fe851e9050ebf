use thiserror::Error;

/// Failure taxonomy of the tracking core. Only an explicit stop request ends the sampling loop,
/// every variant here is handled (logged, tick skipped or dropped) by the caller.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The foreground window or its owning process could not be inspected.
    #[error("Failed to resolve active window: {0}")]
    Resolution(String),

    /// The categorizer was handed an unresolved snapshot.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Failed to terminate process {pid}: {reason}")]
    Termination { pid: u32, reason: String },

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),
}

impl TrackerError {
    pub fn config(reason: impl ToString) -> Self {
        Self::ConfigLoad(reason.to_string())
    }
}
