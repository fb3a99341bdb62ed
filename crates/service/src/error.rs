//! The HTTP boundary's single error-conversion surface. Every upstream error
//! type (`moniker::ParseError`, `resolver::ResolverError`,
//! `catalog::LoadError`) funnels through `ApiError`, which owns the mapping
//! onto the taxonomy in spec §7. The body shape is always
//! `{error, detail, ...contextual fields}`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use resolver::ResolverError;
use serde_json::{json, Value};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("malformed moniker: {0}")]
    Parse(#[from] moniker::ParseError),

    #[error("moniker is syntactically valid but incoherent: {0}")]
    Resolution(String),

    #[error("no binding discoverable for {path:?}")]
    NotFound { path: String },

    #[error("access denied: {message}")]
    AccessDenied { message: String, estimated_rows: u64 },

    #[error("catalog failed to load: {0}")]
    Load(#[from] catalog::LoadError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ResolverError> for ApiError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::Parse(e) => ApiError::Parse(e),
            ResolverError::Resolution(msg) => ApiError::Resolution(msg),
            ResolverError::NotFound { path } => ApiError::NotFound { path },
            ResolverError::AccessDenied {
                message,
                estimated_rows,
            } => ApiError::AccessDenied {
                message,
                estimated_rows,
            },
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Parse(_) => StatusCode::BAD_REQUEST,
            ApiError::Resolution(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            ApiError::Load(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn short(&self) -> &'static str {
        match self {
            ApiError::Parse(_) => "parse_error",
            ApiError::Resolution(_) => "resolution_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::AccessDenied { .. } => "access_denied",
            ApiError::Load(_) => "load_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn contextual_fields(&self) -> Value {
        match self {
            ApiError::NotFound { path } => json!({ "path": path }),
            ApiError::AccessDenied {
                estimated_rows, ..
            } => json!({ "estimated_rows": estimated_rows }),
            _ => json!({}),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = ?status, error = %self, "request failed");
        }

        let mut body = json!({
            "error": self.short(),
            "detail": self.to_string(),
        });
        if let Value::Object(extra) = self.contextual_fields() {
            if let Value::Object(map) = &mut body {
                map.extend(extra);
            }
        }

        (status, Json(body)).into_response()
    }
}
