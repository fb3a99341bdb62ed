use std::path::PathBuf;
use std::sync::Arc;

use catalog::Registry;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::cache::Cache;
use crate::telemetry::TelemetrySink;

/// Shared, cloneable application state handed to every handler via axum's
/// `State` extractor. Cheap to clone: everything behind it is an `Arc`.
#[derive(Clone)]
pub struct AppContext {
    registry: Arc<Registry>,
    cache: Arc<Cache>,
    telemetry: Arc<dyn TelemetrySink>,
    catalog_path: Arc<PathBuf>,
    started_at: DateTime<Utc>,
    shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(
        registry: Arc<Registry>,
        cache: Arc<Cache>,
        telemetry: Arc<dyn TelemetrySink>,
        catalog_path: PathBuf,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            cache,
            telemetry,
            catalog_path: Arc::new(catalog_path),
            started_at: Utc::now(),
            shutdown,
        }
    }

    /// The process-wide shutdown signal (spec §5: "each inbound request
    /// carries a cancellation signal; handlers must propagate it and
    /// abandon work promptly when it fires"). The resolver itself never
    /// yields, so only handlers that perform their own I/O (e.g. a future
    /// dialect-renderer collaborator) need to select on this.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn telemetry(&self) -> &dyn TelemetrySink {
        self.telemetry.as_ref()
    }

    pub fn catalog_path(&self) -> &std::path::Path {
        &self.catalog_path
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
