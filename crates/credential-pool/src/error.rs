//! Error types for pool operations

/// Errors from pool operations.
///
/// `MissingToken` and `NotFound` are detected before any write happens.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no token specified")]
    MissingToken,

    #[error("credential not found: {0}")]
    NotFound(String),

    #[error("credential store error: {0}")]
    Store(#[from] kv_store::Error),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
