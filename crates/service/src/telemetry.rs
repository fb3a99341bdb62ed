//! Telemetry sink interface. Per spec §1 this core treats telemetry as an
//! external collaborator; `POST /telemetry/access` always accepts (202) and
//! forwards the event to whatever `TelemetrySink` the context was built
//! with. The only implementation shipped here logs via `tracing`, keeping
//! the core free of a concrete telemetry backend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    pub moniker: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub detail: serde_json::Map<String, serde_json::Value>,
}

pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &AccessEvent);
}

/// Records every event as a structured `tracing` event rather than
/// forwarding it anywhere; stands in for a real sink (Kafka, a metrics
/// pipeline) that the core does not know about.
pub struct LoggingSink;

impl TelemetrySink for LoggingSink {
    fn record(&self, event: &AccessEvent) {
        tracing::info!(
            moniker = event.moniker.as_deref().unwrap_or(""),
            user_id = event.user_id.as_deref().unwrap_or("anonymous"),
            "telemetry access event"
        );
    }
}
