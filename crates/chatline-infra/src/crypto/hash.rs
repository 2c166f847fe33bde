//! API key generation and SHA-256 hashing.
//!
//! Only the hash of a key is stored; the plaintext is shown once, when the
//! key is issued.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Prefix of every issued key, so leaked keys are easy to recognise.
pub const API_KEY_PREFIX: &str = "chl_";

/// Compute the SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

/// Generate a new random API key.
///
/// 244 random bits from two v4 UUIDs, hex encoded.
pub fn generate_api_key() -> String {
    format!(
        "{API_KEY_PREFIX}{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}
