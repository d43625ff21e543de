//! # Salt Mining
//!
//! Brute-force search for a salt whose derived vault address satisfies a
//! target policy (a hex prefix, by default). The derivation is a pure
//! function of `(owner_address, salt)` — the same function the dev deploy
//! backend uses — so the address is known before any transaction is sent.
//!
//! The search is deliberately stateless and lock-free: it touches no I/O,
//! starts from a random salt so independent processes don't plough the
//! same furrow, and is bounded both by an iteration cap and a wall-clock
//! deadline. Exceeding either budget is [`CoreError::SaltMiningTimeout`].
//!
//! BLAKE3 is the derivation hash, consistent with the rest of the stack.
//! Each added prefix hex digit multiplies the expected search by 16, so a
//! 2-digit prefix averages 256 attempts and a 6-digit prefix averages
//! ~16.7M — budget accordingly.

use rand::Rng;
use std::time::{Duration, Instant};

use crate::config::{
    DEFAULT_ADDRESS_PREFIX, DEFAULT_MINING_DEADLINE, DEFAULT_MINING_MAX_ITERATIONS,
    MINING_DEADLINE_CHECK_INTERVAL,
};
use crate::error::{CoreError, CoreResult};

/// Domain separator for the address derivation preimage.
const ADDRESS_DOMAIN: &[u8] = b"vaultlink:vault-address:v1";

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Target predicate and budget for a mining run.
#[derive(Clone, Debug)]
pub struct AddressPolicy {
    /// Lowercase hex prefix the address must start with (after `0x`).
    /// Empty means any address qualifies.
    pub prefix: String,
    /// Cap on candidate salts tried in one run.
    pub max_iterations: u64,
    /// Wall-clock budget for one run.
    pub deadline: Duration,
}

impl Default for AddressPolicy {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            max_iterations: DEFAULT_MINING_MAX_ITERATIONS,
            deadline: DEFAULT_MINING_DEADLINE,
        }
    }
}

impl AddressPolicy {
    /// Builds a policy, rejecting prefixes that no address can ever match.
    pub fn new(prefix: &str, max_iterations: u64, deadline: Duration) -> CoreResult<Self> {
        if !prefix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            return Err(CoreError::InvalidInput(format!(
                "address prefix must be lowercase hex, got {prefix:?}"
            )));
        }
        if prefix.len() > 40 {
            return Err(CoreError::InvalidInput(
                "address prefix longer than an address".into(),
            ));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            max_iterations,
            deadline,
        })
    }

    /// Whether a derived address satisfies this policy.
    pub fn matches(&self, address: &str) -> bool {
        address
            .strip_prefix("0x")
            .map(|hex| hex.starts_with(&self.prefix))
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derives the deterministic vault address for `(owner_address, salt)`.
///
/// 20 bytes of `BLAKE3(domain || owner || salt_le)`, rendered as `0x`-hex.
pub fn derive_vault_address(owner_address: &str, salt: u64) -> String {
    let digest = blake3::Hasher::new()
        .update(ADDRESS_DOMAIN)
        .update(owner_address.as_bytes())
        .update(&salt.to_le_bytes())
        .finalize();
    format!("0x{}", hex::encode(&digest.as_bytes()[..20]))
}

// ---------------------------------------------------------------------------
// Mining
// ---------------------------------------------------------------------------

/// A successful mining result.
#[derive(Clone, Debug)]
pub struct MinedSalt {
    /// The salt that produced a qualifying address.
    pub salt: u64,
    /// The derived address. Equal to
    /// `derive_vault_address(owner_address, salt)` by construction.
    pub address: String,
    /// How many candidates were tried, for metrics and log lines.
    pub iterations: u64,
}

/// Searches for a salt whose derived address satisfies `policy`.
///
/// CPU-bound and synchronous — callers on an async runtime should run it
/// via `tokio::task::spawn_blocking`. The deadline is checked every
/// [`MINING_DEADLINE_CHECK_INTERVAL`] candidates.
pub fn mine_salt(owner_address: &str, policy: &AddressPolicy) -> CoreResult<MinedSalt> {
    let started = Instant::now();
    let mut salt: u64 = rand::thread_rng().gen();

    for i in 0..policy.max_iterations {
        if i % MINING_DEADLINE_CHECK_INTERVAL == 0 && started.elapsed() > policy.deadline {
            return Err(CoreError::SaltMiningTimeout);
        }

        let address = derive_vault_address(owner_address, salt);
        if policy.matches(&address) {
            return Ok(MinedSalt {
                salt,
                address,
                iterations: i + 1,
            });
        }
        salt = salt.wrapping_add(1);
    }

    Err(CoreError::SaltMiningTimeout)
}
