//! Graceful Shutdown
//!
//! Waits for OS termination signals so the server can stop accepting
//! connections and the application can run its destroy hooks.

use tokio::signal;

/// Create a future that completes when Ctrl+C or SIGTERM is received
///
/// If a signal handler cannot be installed the corresponding branch never
/// completes; the failure is logged.
///
/// # Example
///
/// ```rust,ignore
/// axum::serve(listener, router)
///     .with_graceful_shutdown(shutdown_signal())
///     .await?;
/// app.destroy().await;
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
