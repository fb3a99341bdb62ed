use axum::extract::{Path, RawQuery, State};
use axum::Json;
use resolver::Resolver;

use super::combined_moniker;
use crate::context::AppContext;
use crate::error::ApiError;

/// `GET /describe/<path...>` -- metadata without query rendering or
/// successor chase (spec §4.5 "Describe").
pub async fn describe(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<resolver::DescribeResult>, ApiError> {
    let raw = combined_moniker(&path, query.as_deref());
    let resolver = Resolver::new(ctx.registry());
    Ok(Json(resolver.describe(&raw)?))
}

/// `GET /list/<path...>` -- direct children only.
pub async fn list(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
) -> Result<Json<resolver::ListResult>, ApiError> {
    let resolver = Resolver::new(ctx.registry());
    Ok(Json(resolver.list(&path)?))
}

/// `GET /list` -- direct children of the catalog root. The root path is the
/// empty string, which the moniker grammar rejects as input (empty input is
/// always a parse error), so this bypasses `Resolver::list` and talks to the
/// registry directly rather than manufacturing a fake moniker.
pub async fn list_root(State(ctx): State<AppContext>) -> Json<resolver::ListResult> {
    let snapshot = ctx.registry().pin();
    Json(resolver::ListResult {
        children: snapshot.children_of(""),
        moniker: "moniker://".to_string(),
        path: String::new(),
        ownership: snapshot.resolve_ownership(""),
    })
}

/// `GET /lineage/<path...>` -- ancestor chain plus resolved ownership with
/// provenance.
pub async fn lineage(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
) -> Result<Json<resolver::LineageResult>, ApiError> {
    let resolver = Resolver::new(ctx.registry());
    Ok(Json(resolver.lineage(&path)?))
}
