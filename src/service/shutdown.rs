use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels `cancelation` when the process receives Ctrl-C. Returns early if something else
/// cancelled it first, so it can be joined with the service without keeping it alive.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
