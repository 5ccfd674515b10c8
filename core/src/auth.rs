use rand::Rng;
use sha2::{Digest, Sha256};

pub const API_KEY_PREFIX: &str = "vox_sk_";

/// Generate an API key. Returns `(full_key, sha256_hash)`.
/// Key format: `vox_sk_` + 32 random bytes hex-encoded.
pub fn generate_api_key() -> (String, String) {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    let full_key = format!("{API_KEY_PREFIX}{}", hex::encode(bytes));
    let hash = hash_token(&full_key);
    (full_key, hash)
}

/// SHA-256 hex digest of a token string. Only digests are stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// First 8 chars after the key prefix, kept for display.
pub fn key_prefix(full_key: &str) -> String {
    full_key
        .strip_prefix(API_KEY_PREFIX)
        .map(|rest| rest.chars().take(8).collect())
        .unwrap_or_default()
}

/// Cheap shape check before touching the database.
pub fn looks_like_api_key(token: &str) -> bool {
    token
        .strip_prefix(API_KEY_PREFIX)
        .is_some_and(|rest| rest.len() == 64 && rest.bytes().all(|b| b.is_ascii_hexdigit()))
}
