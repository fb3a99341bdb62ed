//! Graceful shutdown signal, shared by the HTTP server and the catalog
//! reload loop. Resolves on the first `SIGINT`/`SIGTERM` (Unix) or Ctrl+C
//! (all platforms); per spec §6, a clean shutdown observes the signal and
//! drains in-flight requests before exiting with status `0`.

pub const DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

pub async fn signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
