//! Access password policy

use common::Secret;
use sha2::{Digest, Sha256};

/// Whether the administrative surface is password-protected.
///
/// `Disabled` is a deliberate bypass mode, not an error: logins always
/// succeed and the gate lets every request through.
#[derive(Debug, Clone)]
pub enum AccessPolicy {
    Disabled,
    Enabled(Secret<String>),
}

impl AccessPolicy {
    /// Build a policy from an optional configured password.
    ///
    /// Only `None` and the empty string disable the gate. Whitespace is a
    /// real password; trimming is the caller's job.
    pub fn from_password(password: Option<String>) -> Self {
        Self::from_secret(password.map(Secret::new))
    }

    /// Same as `from_password` for a password already wrapped in `Secret`.
    pub fn from_secret(password: Option<Secret<String>>) -> Self {
        match password {
            Some(p) if !p.expose().is_empty() => AccessPolicy::Enabled(p),
            _ => AccessPolicy::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, AccessPolicy::Enabled(_))
    }

    /// Whether `candidate` unlocks the gate.
    ///
    /// Compares SHA-256 digests in constant time so neither the password
    /// length nor the position of the first mismatch leaks through timing.
    pub fn permits(&self, candidate: &str) -> bool {
        match self {
            AccessPolicy::Disabled => true,
            AccessPolicy::Enabled(expected) => {
                let expected = Sha256::digest(expected.expose().as_bytes());
                let actual = Sha256::digest(candidate.as_bytes());
                expected
                    .iter()
                    .zip(actual.iter())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_empty_password_disables() {
        assert!(!AccessPolicy::from_password(None).is_enabled());
        assert!(!AccessPolicy::from_password(Some(String::new())).is_enabled());
    }

    #[test]
    fn whitespace_password_keeps_gate_enabled() {
        let policy = AccessPolicy::from_password(Some("   ".into()));
        assert!(policy.is_enabled());
        assert!(!policy.permits("wrong"));
        assert!(!policy.permits(""));
        assert!(policy.permits("   "));
    }

    #[test]
    fn disabled_permits_anything() {
        let policy = AccessPolicy::Disabled;
        assert!(policy.permits(""));
        assert!(policy.permits("whatever"));
    }

    #[test]
    fn enabled_permits_only_exact_match() {
        let policy = AccessPolicy::from_password(Some("s3cret".into()));
        assert!(policy.is_enabled());
        assert!(policy.permits("s3cret"));
        assert!(!policy.permits("s3cre"));
        assert!(!policy.permits("s3cret "));
        assert!(!policy.permits("S3CRET"));
        assert!(!policy.permits(""));
    }

    #[test]
    fn debug_never_shows_password() {
        let policy = AccessPolicy::from_password(Some("s3cret".into()));
        let debug = format!("{policy:?}");
        assert!(!debug.contains("s3cret"), "got: {debug}");
    }
}
