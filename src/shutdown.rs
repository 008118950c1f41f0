use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels `token` on Ctrl-C, or SIGTERM on unix.
pub fn listen_for_signals(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received interrupt signal");
                ctrl_c_token.cancel();
            }
            Err(err) => error!(error = %err, "could not listen for interrupt signal"),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM");
                token.cancel();
            }
            Err(err) => error!(error = %err, "could not listen for SIGTERM"),
        }
    });
}
