use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Detects stop signals sent to the process and cancels `cancelation`. Returns early when the
/// token is cancelled by someone else.
///
/// On Windows detached processes can't receive console signals, `usage-warden stop` kills them
/// instead.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Can't listen for ctrl-c {e}");
                return;
            }
            info!("Received ctrl-c, stopping");
            cancelation.cancel();
        },
        _ = terminate_signal() => {
            info!("Received terminate signal, stopping");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!("Can't listen for SIGTERM {e}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await
}
