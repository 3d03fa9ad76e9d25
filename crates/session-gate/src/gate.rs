//! Session issuance, validation and request gating
//!
//! The gate holds no session state of its own. Issuance writes one key with a
//! TTL, validation is a single `exists` call, and nothing ever extends or
//! refreshes a session.

use std::sync::Arc;
use std::time::Duration;

use common::fingerprint;
use kv_store::KvStore;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::policy::AccessPolicy;
use crate::token::generate_session_token;

/// Key namespace for live sessions: `login:token:<token>`.
pub const SESSION_KEY_PREFIX: &str = "login:token:";

/// Value stored under a session key. Only the key's existence is checked.
const SESSION_MARKER: &str = "valid";

/// Lifetime of an issued session.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Query parameter checked first for a session token.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Cookie checked when the query parameter is absent or empty.
pub const TOKEN_COOKIE: &str = "auth_token";

/// Where denied requests are sent.
pub const LOGIN_REDIRECT: &str = "/login?error=token_expired";

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through unchanged.
    Allow,
    /// Halt the request and redirect to the login entry point.
    Deny { redirect: &'static str },
}

/// Password check plus store-backed session tokens.
pub struct SessionGate {
    store: Arc<dyn KvStore>,
    policy: AccessPolicy,
    ttl: Duration,
}

impl SessionGate {
    pub fn new(store: Arc<dyn KvStore>, policy: AccessPolicy) -> Self {
        info!(
            enabled = policy.is_enabled(),
            store = store.id(),
            "session gate initialized"
        );
        Self {
            store,
            policy,
            ttl: SESSION_TTL,
        }
    }

    /// Override the session lifetime (defaults to 24 hours).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Exchange the access password for a new session token.
    ///
    /// Every successful call mints fresh random bytes; tokens are never
    /// reused. A wrong password returns `Unauthorized` without touching the
    /// store. A failed store write is returned as-is and not retried.
    pub async fn issue(&self, password: &str) -> Result<String> {
        if !self.policy.permits(password) {
            warn!("login rejected: wrong access password");
            return Err(Error::Unauthorized);
        }

        let token = generate_session_token();
        let key = session_key(&token);
        self.store.set(&key, SESSION_MARKER, Some(self.ttl)).await?;

        info!(
            session = %fingerprint(&token),
            ttl_secs = self.ttl.as_secs(),
            "session issued"
        );
        Ok(token)
    }

    /// Whether `token` names a live session.
    ///
    /// Empty tokens are never valid. Store errors count as "not found" so an
    /// unreachable store denies access rather than granting it.
    pub async fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        match self.store.exists(&session_key(token)).await {
            Ok(present) => {
                if !present {
                    debug!(session = %fingerprint(token), "session unknown or expired");
                }
                present
            }
            Err(e) => {
                warn!(session = %fingerprint(token), error = %e, "session lookup failed, denying");
                false
            }
        }
    }

    /// Gate one request given the token candidates it carried.
    ///
    /// The query parameter wins when present and non-empty; otherwise the
    /// cookie is used. With the gate disabled every request is allowed
    /// without consulting the store.
    pub async fn check(&self, query_token: Option<&str>, cookie_token: Option<&str>) -> GateDecision {
        if !self.policy.is_enabled() {
            return GateDecision::Allow;
        }

        let token = select_candidate(query_token, cookie_token).unwrap_or_default();
        if self.validate(token).await {
            GateDecision::Allow
        } else {
            GateDecision::Deny {
                redirect: LOGIN_REDIRECT,
            }
        }
    }
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

/// Pick the token to validate: query parameter first, cookie as fallback.
fn select_candidate<'a>(query_token: Option<&'a str>, cookie_token: Option<&'a str>) -> Option<&'a str> {
    query_token
        .filter(|t| !t.is_empty())
        .or(cookie_token)
}
