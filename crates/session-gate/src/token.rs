//! Session token generation

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

/// Bytes of entropy per session token.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Generate a fresh session token.
///
/// 32 random bytes from the thread-local CSPRNG, encoded as URL-safe base64
/// without padding (43 characters) so the token survives query strings and
/// cookies without escaping.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn token_is_url_safe_base64() {
        let token = generate_session_token();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "token must be URL-safe base64 (no padding): {token}"
        );
    }

    #[test]
    fn token_decodes_to_full_entropy() {
        let token = generate_session_token();
        let decoded = URL_SAFE_NO_PAD.decode(&token).expect("valid base64url");
        assert_eq!(decoded.len(), SESSION_TOKEN_BYTES);
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_session_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
