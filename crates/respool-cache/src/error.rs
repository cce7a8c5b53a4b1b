use thiserror::Error;

/// Result type local to respool-cache.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("factory for key '{key}' returned a resource already pooled under key '{existing}'")]
    DuplicateResource { key: String, existing: String },

    #[error("resource factory failed: {0}")]
    Factory(#[source] Box<dyn std::error::Error + Send + Sync>),
}
