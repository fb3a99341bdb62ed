use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use catalog::{loader, Registry};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::cache::Cache;
use crate::config::Settings;
use crate::context::AppContext;
use crate::cors::cors_layer;
use crate::routes::router;
use crate::shutdown;
use crate::telemetry::{LoggingSink, TelemetrySink};

/// Loads the catalog synchronously; a failure here is process-fatal (spec
/// §6: non-zero exit "catalog fails to load on first read").
pub fn load_initial_registry(catalog_path: &std::path::Path) -> anyhow::Result<Registry> {
    let nodes = loader::load(catalog_path)?;
    let registry = Registry::empty();
    registry.atomic_replace(nodes)?;
    Ok(registry)
}

/// Assembles the `AppContext`, spawns the background reload loop, builds the
/// router, and binds the listener. Returns a future that runs the server
/// until a shutdown signal fires and in-flight requests drain.
pub async fn run(
    settings: &Settings,
    registry: Registry,
    catalog_path: PathBuf,
) -> anyhow::Result<impl Future<Output = anyhow::Result<()>>> {
    let registry = Arc::new(registry);
    let cache = Arc::new(Cache::new(
        settings.cache.enabled,
        settings.cache.ttl(),
        settings.cache.max_entries,
    ));
    let telemetry: Arc<dyn TelemetrySink> = Arc::new(LoggingSink);

    // One root cancellation token, shared by every inbound request's
    // cancellation signal (spec §5) and by the background reloader. Each
    // gets its own child so cancelling the root cancels both without
    // either being able to cancel the other independently.
    let cancel = CancellationToken::new();
    let context = AppContext::new(
        registry.clone(),
        cache,
        telemetry,
        catalog_path.clone(),
        cancel.clone(),
    );

    tokio::spawn(loader::reload_loop(
        registry,
        catalog_path,
        settings.catalog.reload_interval(),
        cancel.child_token(),
    ));

    let app = router(context).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer()),
    );

    let listener = TcpListener::bind(settings.application.address()).await?;
    tracing::info!(address = %settings.application.address(), "listening");

    Ok(async move {
        let watchdog_cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown::signal().await;
            watchdog_cancel.cancel();
        });

        // Bounds the drain to `shutdown::DRAIN_TIMEOUT` measured from the
        // moment the signal actually arrives, not from process start: once
        // that elapses with connections still open, the process exits
        // anyway rather than hanging indefinitely.
        let watchdog_cancel = cancel.clone();
        tokio::spawn(async move {
            watchdog_cancel.cancelled().await;
            tokio::time::sleep(shutdown::DRAIN_TIMEOUT).await;
            tracing::warn!(
                seconds = shutdown::DRAIN_TIMEOUT.as_secs(),
                "drain timeout elapsed with requests still in flight, exiting anyway"
            );
            std::process::exit(0);
        });

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        Ok(())
    })
}
