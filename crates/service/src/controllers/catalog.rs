use axum::extract::{Path, Query, State};
use axum::Json;
use catalog::NodeStatus;
use serde::Deserialize;
use serde_json::json;

use crate::context::AppContext;
use crate::error::ApiError;

fn default_list_limit() -> usize {
    100
}

fn default_search_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    cursor: Option<String>,
    #[serde(default = "default_list_limit")]
    limit: usize,
}

/// `GET /catalog` -- paginated listing, position-based cursor over the
/// sorted path list (spec §4.3, §9 non-guarantee under concurrent swap).
pub async fn list(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> Json<serde_json::Value> {
    let limit = params.limit.min(1000);
    let (nodes, next_cursor) = ctx.registry().paginate(params.cursor.as_deref(), limit);
    Json(json!({ "nodes": nodes, "next_cursor": next_cursor }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    #[serde(default = "default_search_limit")]
    limit: usize,
}

/// `GET /catalog/search?q=&limit=` -- case-insensitive substring match on
/// path, display_name, description, and tags.
pub async fn search(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchParams>,
) -> Json<serde_json::Value> {
    let matches = ctx.registry().search(&params.q, params.limit);
    Json(json!({ "nodes": matches }))
}

/// `GET /catalog/stats` -- counts by status and by source type.
pub async fn stats(State(ctx): State<AppContext>) -> Json<catalog::Stats> {
    Json(ctx.registry().stats())
}

#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    status: NodeStatus,
}

/// `PUT /catalog/<path...>/status` -- mutates the live snapshot only; per
/// spec §9's open question this implementation documents (rather than
/// prevents) the drift: the next successful reload overwrites it. See
/// `catalog::Registry::set_status`.
pub async fn set_status(
    State(ctx): State<AppContext>,
    Path(tail): Path<String>,
    Json(body): Json<SetStatusBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let path = tail.strip_suffix("/status").ok_or_else(|| {
        ApiError::Resolution(format!("expected a trailing /status segment, got {tail:?}"))
    })?;

    ctx.registry()
        .set_status(path, body.status, "admin")
        .map_err(|e| ApiError::Resolution(e.to_string()))?;

    Ok(Json(json!({ "path": path, "status": body.status })))
}

/// `GET /catalog/<path...>/audit` -- audit entries for a path, possibly
/// empty.
pub async fn audit(
    State(ctx): State<AppContext>,
    Path(tail): Path<String>,
) -> Result<Json<Vec<catalog::AuditEntry>>, ApiError> {
    let path = tail.strip_suffix("/audit").ok_or_else(|| {
        ApiError::Resolution(format!("expected a trailing /audit segment, got {tail:?}"))
    })?;
    Ok(Json(ctx.registry().audit_log(path)))
}
