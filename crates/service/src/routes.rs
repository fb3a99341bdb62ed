//! Route table (spec §6). One `Router` assembled from per-concern
//! controllers, mirroring `control::routes::router` and
//! `control-plane-api::server::mod::router`'s flat `.route(...)` chains.

use axum::routing::{get, post};
use axum::Router;

use crate::context::AppContext;
use crate::controllers;

pub fn router(context: AppContext) -> Router {
    Router::new()
        .route("/health", get(controllers::health::show))
        .route("/resolve/batch", post(controllers::resolve::resolve_batch))
        .route("/resolve/*path", get(controllers::resolve::resolve))
        .route("/describe/*path", get(controllers::describe::describe))
        .route("/list", get(controllers::describe::list_root))
        .route("/list/*path", get(controllers::describe::list))
        .route("/lineage/*path", get(controllers::describe::lineage))
        .route("/catalog", get(controllers::catalog::list))
        .route("/catalog/search", get(controllers::catalog::search))
        .route("/catalog/stats", get(controllers::catalog::stats))
        .route(
            "/catalog/*path",
            get(controllers::catalog::audit).put(controllers::catalog::set_status),
        )
        .route("/metadata/*path", get(controllers::metadata::show))
        .route("/tree", get(controllers::tree::root))
        .route("/tree/*path", get(controllers::tree::show))
        .route("/cache/status", get(controllers::cache::status))
        .route("/cache/refresh/*path", post(controllers::cache::refresh))
        .route("/telemetry/access", post(controllers::telemetry::record))
        .route("/config/reload", post(controllers::admin::reload))
        .route("/ui", get(controllers::ui::show))
        .with_state(context)
}
