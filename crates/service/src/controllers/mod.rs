pub mod admin;
pub mod cache;
pub mod catalog;
pub mod describe;
pub mod health;
pub mod metadata;
pub mod resolve;
pub mod telemetry;
pub mod tree;
pub mod ui;

use axum::http::HeaderMap;
use resolver::Caller;

/// Builds a [`Caller`] from the `X-User-ID` identity header. The core
/// records who asked but never enforces identity -- see spec §6.
pub fn caller_from_headers(headers: &HeaderMap) -> Caller {
    let user_id = headers
        .get("X-User-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| "anonymous".to_string());
    Caller { user_id }
}

/// Joins a wildcard-captured URL path with its raw query string into the
/// combined form the moniker grammar expects (`path?query`).
pub fn combined_moniker(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    }
}
