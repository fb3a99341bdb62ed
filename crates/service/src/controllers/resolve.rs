use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::Json;
use resolver::Resolver;
use serde::Deserialize;
use serde_json::Value;

use super::{caller_from_headers, combined_moniker};
use crate::context::AppContext;
use crate::error::ApiError;

const MAX_BATCH: usize = 100;

/// `GET /resolve/<path...>` -- full resolution (spec §4.5), read-through the
/// response cache.
pub async fn resolve(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let raw = combined_moniker(&path, query.as_deref());
    Ok(Json(resolve_one(&ctx, &raw, &headers)?))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    monikers: Vec<String>,
}

/// `POST /resolve/batch` -- body `{monikers: [string]}`, capped at 100;
/// returns one entry per input, each either the resolve body or
/// `{moniker, error}`.
pub async fn resolve_batch(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<BatchRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
    if body.monikers.len() > MAX_BATCH {
        return Err(ApiError::Resolution(format!(
            "batch of {} exceeds the limit of {MAX_BATCH}",
            body.monikers.len()
        )));
    }

    let results = body
        .monikers
        .iter()
        .map(|raw| match resolve_one(&ctx, raw, &headers) {
            Ok(value) => value,
            Err(err) => serde_json::json!({ "moniker": raw, "error": err.to_string() }),
        })
        .collect();

    Ok(Json(results))
}

fn resolve_one(ctx: &AppContext, raw: &str, headers: &HeaderMap) -> Result<Value, ApiError> {
    if let Some(cached) = ctx.cache().get(raw) {
        return Ok(cached);
    }

    let caller = caller_from_headers(headers);
    let resolver = Resolver::new(ctx.registry());
    let result = resolver.resolve(raw, &caller)?;

    let value = serde_json::to_value(&result)
        .map_err(|e| ApiError::Internal(anyhow::Error::from(e)))?;
    ctx.cache().put(raw.to_string(), value.clone());
    Ok(value)
}
