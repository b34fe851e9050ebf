use std::{path::PathBuf, sync::Arc};

use tokio::sync::watch;
use tracing::{error, info};

use super::{RuleConfig, loader};

/// Holds the current configuration snapshot. Readers get an `Arc` to an immutable
/// [RuleConfig]; reloads publish a whole new snapshot, so a tick never sees a half applied
/// update.
#[derive(Clone)]
pub struct SharedRuleConfig {
    sender: Arc<watch::Sender<Arc<RuleConfig>>>,
    receiver: watch::Receiver<Arc<RuleConfig>>,
}

impl SharedRuleConfig {
    pub fn new(config: RuleConfig) -> Self {
        let (sender, receiver) = watch::channel(Arc::new(config));
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn snapshot(&self) -> Arc<RuleConfig> {
        self.receiver.borrow().clone()
    }

    pub fn replace(&self, config: RuleConfig) {
        self.sender.send_replace(Arc::new(config));
    }
}

/// Re-reads the configuration file on demand. A file that fails to load leaves the current
/// snapshot in place and is never overwritten.
pub struct ConfigReloader {
    path: PathBuf,
    shared: SharedRuleConfig,
}

impl ConfigReloader {
    pub fn new(path: PathBuf, shared: SharedRuleConfig) -> Self {
        Self { path, shared }
    }

    pub async fn reload(&self) -> bool {
        match loader::load(&self.path).await {
            Ok(config) => {
                self.shared.replace(config);
                info!("Reloaded configuration from {:?}", self.path);
                true
            }
            Err(e) => {
                error!("Keeping previous configuration, reload failed: {e}");
                false
            }
        }
    }
}
