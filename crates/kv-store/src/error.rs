//! Error types for store operations

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The store could not be reached (connect failure, dropped connection, timeout).
    #[error("store connection error: {0}")]
    Connection(String),

    /// The store was reached but rejected or failed the command.
    #[error("store command failed: {0}")]
    Command(String),
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
        {
            Error::Connection(e.to_string())
        } else {
            Error::Command(e.to_string())
        }
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;
