//! Pool of upstream API credentials
//!
//! Each credential is an upstream token paired with the tenant endpoint it
//! belongs to. The pool keeps nothing in memory: every call goes to the
//! key-value store, which is the single source of truth.
//!
//! Credential lifecycle:
//! 1. Admin registers a token → hash `token:<token>` with field `tenant_url`
//! 2. Proxy asks for a credential → pinned one if set, otherwise a random pick
//! 3. Admin pins a token → `current_token` points at it until re-pinned
//! 4. Admin deletes a token → hash removed; a stale pin falls back to random

pub mod error;
pub mod pool;

pub use error::{Error, Result};
pub use pool::{
    ACTIVE_CREDENTIAL_KEY, CREDENTIAL_KEY_PREFIX, Credential, CredentialPool, TENANT_URL_FIELD,
};
