//! # One-Time Credentials
//!
//! Minting and fingerprinting of the API keys handed out by the claim
//! flow. The key itself exists in exactly two places, ever: the CSPRNG
//! output on the stack here, and the single HTTP response that reveals it.
//! What gets persisted is its SHA-256 digest, which is enough for the
//! upstream API gateway to validate presented keys and useless to anyone
//! who reads the database.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::config::{API_KEY_ENTROPY_BYTES, API_KEY_PREFIX};

/// Mints a fresh API key: `vlk_` + hex-encoded CSPRNG bytes.
pub fn mint_api_key() -> String {
    let mut entropy = [0u8; API_KEY_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut entropy);
    format!("{API_KEY_PREFIX}{}", hex::encode(entropy))
}

/// SHA-256 hex digest of a key — the only form that is ever persisted.
pub fn digest_of(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}
