//! Shared types for the token gateway crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::{Secret, fingerprint};
