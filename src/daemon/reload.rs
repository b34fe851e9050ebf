use tokio_util::sync::CancellationToken;

use crate::config::shared::ConfigReloader;

/// Reloads the configuration every time the process receives SIGHUP. Finishes once `cancelation`
/// is cancelled.
#[cfg(unix)]
pub async fn watch_reload(reloader: ConfigReloader, cancelation: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::{error, info};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(v) => v,
        Err(e) => {
            error!("Can't listen for SIGHUP, configuration reload is disabled {e}");
            cancelation.cancelled().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = cancelation.cancelled() => break,
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                info!("Received SIGHUP");
                reloader.reload().await;
            }
        }
    }
}

/// Signal based reload is only available on unix, the daemon has to be restarted elsewhere.
#[cfg(not(unix))]
pub async fn watch_reload(_reloader: ConfigReloader, cancelation: CancellationToken) {
    cancelation.cancelled().await;
}
