//! Error types for session operations

/// Errors from session issuance.
///
/// Validation never errors: store failures there are folded into "invalid".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid access password")]
    Unauthorized,

    #[error("failed to persist session: {0}")]
    Store(#[from] kv_store::Error),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
