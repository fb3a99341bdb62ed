use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::context::AppContext;

/// `GET /health` -- liveness plus a coarse view of loaded state, per spec §6.
pub async fn show(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let cache_status = ctx.cache().status();
    Json(json!({
        "status": "ok",
        "nodes": ctx.registry().len(),
        "cache": cache_status,
        "started_at": ctx.started_at(),
    }))
}
