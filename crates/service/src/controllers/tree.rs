use axum::extract::{Path, State};
use axum::Json;
use catalog::CatalogNode;
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct TreeResult {
    path: String,
    node: Option<CatalogNode>,
    children: Vec<String>,
}

fn build(ctx: &AppContext, path: &str) -> TreeResult {
    let snapshot = ctx.registry().pin();
    TreeResult {
        node: snapshot.get_exact(path),
        children: snapshot.children_of(path),
        path: path.to_string(),
    }
}

/// `GET /tree` -- root node summary (no registered node at the empty path,
/// so `node` is always `None` here) plus its immediate children.
pub async fn root(State(ctx): State<AppContext>) -> Json<TreeResult> {
    Json(build(&ctx, ""))
}

/// `GET /tree/<path...>` -- a node's own record, if registered, plus its
/// immediate children. Unlike `/metadata`, this never synthesizes a virtual
/// node into the response; `node` is `None` for unregistered paths that
/// still have registered descendants.
pub async fn show(State(ctx): State<AppContext>, Path(path): Path<String>) -> Json<TreeResult> {
    Json(build(&ctx, &path))
}
