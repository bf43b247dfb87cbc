//! SHA-256 digests for secrets that are looked up but never stored in clear.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `content`.
///
/// Invitation tokens are stored only as this digest; lookups hash the
/// presented token and compare digests.
pub fn token_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_hex() {
        let a = token_digest("invite-token");
        assert_eq!(a, token_digest("invite-token"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_different_tokens_differ() {
        assert_ne!(token_digest("a"), token_digest("b"));
    }
}
