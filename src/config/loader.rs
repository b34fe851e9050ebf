use std::{io::ErrorKind, path::Path};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, info, warn};

use crate::error::TrackerError;

use super::RuleConfig;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Reads and validates the configuration at `path`.
pub async fn load(path: &Path) -> Result<RuleConfig, TrackerError> {
    debug!("Loading configuration from {path:?}");
    let mut file = File::open(path).await.map_err(TrackerError::config)?;
    file.lock_shared().map_err(TrackerError::config)?;
    let mut text = String::new();
    let read = file.read_to_string(&mut text).await;
    file.unlock_async().await.map_err(TrackerError::config)?;
    read.map_err(TrackerError::config)?;

    RuleConfig::from_json(&text)
}

/// Writes `config` to `path`, replacing whatever is there.
pub async fn write(path: &Path, config: &RuleConfig) -> Result<(), TrackerError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(TrackerError::config)?;
    }
    let text = config.to_json()?;
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
        .map_err(TrackerError::config)?;

    file.lock_exclusive().map_err(TrackerError::config)?;
    let result = async {
        file.set_len(0).await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;
    file.unlock_async().await.map_err(TrackerError::config)?;
    result.map_err(TrackerError::config)
}

/// Loads the configuration, falling back to the built-in default when the file is missing or
/// invalid. An invalid file is kept next to the new one with an `.invalid` suffix.
pub async fn load_or_default(path: &Path) -> Result<RuleConfig, TrackerError> {
    match load(path).await {
        Ok(config) => return Ok(config),
        Err(e) => warn!("Configuration {path:?} is unusable, writing default: {e}"),
    }

    match tokio::fs::metadata(path).await {
        Ok(_) => {
            let mut backup = path.as_os_str().to_owned();
            backup.push(".invalid");
            tokio::fs::rename(path, &backup)
                .await
                .map_err(TrackerError::config)?;
            info!("Moved invalid configuration to {backup:?}");
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(TrackerError::config(e)),
    }

    write(path, &RuleConfig::default()).await?;
    load(path).await
}
