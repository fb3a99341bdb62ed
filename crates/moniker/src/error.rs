use thiserror::Error;

/// Failure parsing a raw moniker string. The parser never panics; every
/// malformed input is reported through one of these variants, identifying
/// the offending token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("moniker string is empty")]
    Empty,

    #[error("unrecognized scheme; expected `moniker://`")]
    InvalidScheme,

    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),

    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),

    #[error("invalid sub_resource: {0:?}")]
    InvalidSubResource(String),

    #[error("invalid revision suffix: {0:?}")]
    InvalidRevision(String),
}
