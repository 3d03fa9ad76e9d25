//! Session gate for the gateway's administrative surface
//!
//! Operators prove knowledge of a shared access password once and receive an
//! opaque session token. The token lives in the key-value store under
//! `login:token:<token>` with a 24-hour TTL; the store's expiry is the only
//! revocation mechanism.
//!
//! Session flow:
//! 1. Operator posts the password → `SessionGate::issue()` stores and returns a token
//! 2. Browser carries the token as `?token=` or the `auth_token` cookie
//! 3. Router middleware calls `SessionGate::check()` on every protected request
//! 4. Missing, unknown or expired tokens → redirect to `/login?error=token_expired`
//!
//! With no password configured (`AccessPolicy::Disabled`) the gate is open:
//! every password is accepted and every request is allowed.

pub mod error;
pub mod gate;
pub mod policy;
pub mod token;

pub use error::{Error, Result};
pub use gate::{
    GateDecision, LOGIN_REDIRECT, SESSION_KEY_PREFIX, SESSION_TTL, SessionGate, TOKEN_COOKIE,
    TOKEN_QUERY_PARAM,
};
pub use policy::AccessPolicy;
pub use token::generate_session_token;
