use thiserror::Error;

/// The typed error ladder returned by the resolver. The HTTP boundary maps
/// each variant onto a distinct status code; nothing else in the request
/// path uses errors for control flow.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("malformed moniker: {0}")]
    Parse(#[from] moniker::ParseError),

    #[error("moniker is syntactically valid but incoherent: {0}")]
    Resolution(String),

    #[error("no binding discoverable for {path:?}")]
    NotFound { path: String },

    #[error("access denied: {message}")]
    AccessDenied { message: String, estimated_rows: u64 },
}
