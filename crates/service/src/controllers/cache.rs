use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use crate::cache::CacheStatus;
use crate::context::AppContext;

/// `GET /cache/status` -- backend status, `{enabled, size}`.
pub async fn status(State(ctx): State<AppContext>) -> Json<CacheStatus> {
    Json(ctx.cache().status())
}

/// `POST /cache/refresh/<path...>` -- evicts the cache entry keyed by this
/// path, if one exists. The read-through cache keys entries by the raw
/// request string passed to `/resolve`, so this only evicts entries whose
/// key exactly matches `path` (no query string, no version suffix).
pub async fn refresh(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
) -> Json<serde_json::Value> {
    let evicted = ctx.cache().invalidate(&path);
    Json(json!({ "path": path, "evicted": evicted }))
}
