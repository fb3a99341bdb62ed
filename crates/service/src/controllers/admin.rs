use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::context::AppContext;

/// `POST /config/reload` -- forces an immediate synchronous reload of the
/// declarative catalog, the same `reload_once` the background loop calls on
/// its own timer. Per spec §7, a failed reload is surfaced in the response
/// body rather than as an HTTP error status: the previous snapshot is
/// retained and still serving, so this is not itself a failure of the
/// endpoint.
pub async fn reload(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    match catalog::loader::reload_once(ctx.registry(), ctx.catalog_path()) {
        Ok(count) => Json(json!({ "reloaded": true, "nodes": count })),
        Err(err) => Json(json!({ "reloaded": false, "error": err.to_string() })),
    }
}
