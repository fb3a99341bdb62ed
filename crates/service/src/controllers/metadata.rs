use axum::extract::{Path, State};
use axum::Json;
use catalog::{CatalogNode, ResolvedOwnership};
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct MetadataResult {
    node: CatalogNode,
    ownership: ResolvedOwnership,
    has_source_binding: bool,
    source_type: Option<catalog::SourceType>,
}

fn build(ctx: &AppContext, path: &str) -> MetadataResult {
    let snapshot = ctx.registry().pin();
    let node = snapshot.lookup(path);
    let ownership = snapshot.resolve_ownership(path);
    MetadataResult {
        has_source_binding: node.binding.is_some(),
        source_type: node.binding.as_ref().map(|b| b.source_type),
        node,
        ownership,
    }
}

/// `GET /metadata/<path...>` -- node, resolved ownership, and a binding
/// summary, with no query rendering and no successor chase (distinct from
/// `/describe`, which also runs through the moniker grammar for version and
/// query-param parsing; this one takes the path literally).
pub async fn show(State(ctx): State<AppContext>, Path(path): Path<String>) -> Json<MetadataResult> {
    Json(build(&ctx, &path))
}
