//! Shutdown signals.
//!
//! The host normally ends the plugin by closing the socket; a terminal or
//! service manager may send SIGINT or SIGTERM instead.

use tracing::warn;

/// Resolve when the process is asked to stop, yielding the signal name.
pub async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                return tokio::select! {
                    _ = terminate.recv() => "SIGTERM",
                    _ = interrupt() => "SIGINT",
                };
            }
            Err(e) => warn!(error = %e, "SIGTERM handler unavailable"),
        }
    }

    interrupt().await
}

async fn interrupt() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
