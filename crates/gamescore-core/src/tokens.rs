//! Event access tokens
//!
//! Every event gets three random tokens (admin, scorer, public). Only their
//! SHA-256 digests are stored; the plain tokens are handed out once.

use gamescore_types::{EventTokens, TokenRole};
use sha2::{Digest, Sha256};

/// 32 lowercase hex characters
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Lowercase hex SHA-256 digest of `token`
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Length-checked comparison that does not short-circuit on the first mismatch
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Stored digests of an event's tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTokenHashes {
    pub admin: String,
    pub scorer: String,
    pub public: String,
}

impl EventTokenHashes {
    /// Role granted by `token`, checking admin, then scorer, then public
    pub fn role_for(&self, token: &str) -> Option<TokenRole> {
        let digest = hash_token(token);
        if constant_time_eq(&digest, &self.admin) {
            Some(TokenRole::Admin)
        } else if constant_time_eq(&digest, &self.scorer) {
            Some(TokenRole::Scorer)
        } else if constant_time_eq(&digest, &self.public) {
            Some(TokenRole::Viewer)
        } else {
            None
        }
    }
}

/// Fresh plain tokens together with the digests to persist
#[derive(Debug, Clone)]
pub struct GeneratedTokens {
    pub plain: EventTokens,
    pub hashed: EventTokenHashes,
}

impl GeneratedTokens {
    pub fn generate() -> Self {
        let plain = EventTokens {
            admin_token: generate_token(),
            scorer_token: generate_token(),
            public_token: generate_token(),
        };
        let hashed = EventTokenHashes {
            admin: hash_token(&plain.admin_token),
            scorer: hash_token(&plain.scorer_token),
            public: hash_token(&plain.public_token),
        };
        Self { plain, hashed }
    }
}

/// Cheap shape check run before any database lookup
pub fn is_valid_token_format(token: &str) -> bool {
    (32..=128).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(is_valid_token_format(&token));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_role_resolution() {
        let tokens = GeneratedTokens::generate();
        let hashes = &tokens.hashed;

        assert_eq!(hashes.role_for(&tokens.plain.admin_token), Some(TokenRole::Admin));
        assert_eq!(hashes.role_for(&tokens.plain.scorer_token), Some(TokenRole::Scorer));
        assert_eq!(hashes.role_for(&tokens.plain.public_token), Some(TokenRole::Viewer));
        assert_eq!(hashes.role_for(&generate_token()), None);
        assert_eq!(hashes.role_for(""), None);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abcd", "abcd"));
        assert!(!constant_time_eq("abcd", "abce"));
        assert!(!constant_time_eq("abc", "abcd"));
    }

    #[test]
    fn test_token_format() {
        assert!(!is_valid_token_format("short"));
        assert!(!is_valid_token_format(&"z".repeat(32)));
        assert!(is_valid_token_format(&"a".repeat(64)));
    }
}
