//! # Service Configuration & Constants
//!
//! Every magic number in VaultLink lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! Several of these values are part of the service's externally observable
//! contract (the TTL ceiling, the API key prefix, the default chain id), so
//! changing them is an API change, not a refactor.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Chains
// ---------------------------------------------------------------------------

/// Chain id used whenever a caller omits or blanks the `chainId` field.
///
/// Callers asking for any *other* unregistered chain get `UnknownChain` —
/// the default is a convenience, never a silent fallback.
pub const DEFAULT_CHAIN_ID: &str = "1";

/// Token address assumed when the initiate call doesn't name one.
/// The all-zero address conventionally means the chain's native asset.
pub const DEFAULT_TOKEN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ---------------------------------------------------------------------------
// Link Request TTLs
// ---------------------------------------------------------------------------

/// TTL applied when the caller doesn't pass `expiresInSeconds`.
pub const DEFAULT_LINK_TTL_SECS: u64 = 900;

/// Hard ceiling on caller-supplied TTLs. A link request that can sit
/// claimable for more than an hour is an attack surface, not a feature.
/// There is no floor: a one-second TTL yields a one-second window.
pub const MAX_LINK_TTL_SECS: u64 = 3_600;

// ---------------------------------------------------------------------------
// Magic Amounts
// ---------------------------------------------------------------------------

/// Base deposit size in the token's smallest unit.
pub const MAGIC_AMOUNT_BASE: u64 = 1_000_000;

/// Width of the per-request random jitter window added to the base.
///
/// The jitter is what makes two concurrent requests from the same wallet
/// distinguishable on-chain: each request expects a different exact amount.
pub const MAGIC_AMOUNT_JITTER: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Prefix on every minted API key. Lets log scrubbers and secret scanners
/// recognize VaultLink keys on sight.
pub const API_KEY_PREFIX: &str = "vlk_";

/// Random bytes of entropy behind each API key (hex-encoded in the key).
pub const API_KEY_ENTROPY_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// Salt Mining
// ---------------------------------------------------------------------------

/// Default hex prefix a mined vault address must start with (after `0x`).
pub const DEFAULT_ADDRESS_PREFIX: &str = "00";

/// Default cap on mining iterations before giving up.
pub const DEFAULT_MINING_MAX_ITERATIONS: u64 = 5_000_000;

/// Default wall-clock budget for a single mining run.
pub const DEFAULT_MINING_DEADLINE: Duration = Duration::from_secs(10);

/// How many candidate salts are tried between deadline checks.
/// `Instant::now()` is cheap but not free; checking every iteration
/// roughly doubles the cost of the inner loop.
pub const MINING_DEADLINE_CHECK_INTERVAL: u64 = 1_024;
