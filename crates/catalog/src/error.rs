use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read catalog file {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate catalog key {0:?}")]
    DuplicateKey(String),

    #[error("failed to parse catalog file {path:?}: {source}")]
    Yaml {
        path: std::path::PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("catalog entry {0:?} is not a mapping")]
    NotAMapping(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate node path {0:?} within one snapshot")]
    DuplicatePath(String),

    #[error("no node registered at path {0:?}")]
    NotFound(String),
}
