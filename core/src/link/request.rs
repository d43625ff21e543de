//! # Link Request Record
//!
//! The persisted state of one wallet-link attempt. A request is created
//! `Pending`, and the only transitions the stores will accept are the ones
//! in the diagram below — each enforced by compare-and-swap, never by
//! read-then-write:
//!
//! ```text
//!   Pending ──(deposit observed)──► Completed ──(next read)──► AlreadyClaimed
//!      │
//!      └──(deadline passed)──► Expired
//! ```
//!
//! `Completed` is deliberately short-lived: it exists only in the response
//! that reveals the credential and in the store until the next read flips
//! it to `AlreadyClaimed`. `Expired` and `AlreadyClaimed` are terminal.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{MAGIC_AMOUNT_BASE, MAGIC_AMOUNT_JITTER};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Claim state of a link request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    /// Waiting for the deposit to land (or for the deadline to pass).
    Pending,
    /// Deposit observed, credential minted. Exactly one response ever
    /// carries this status together with the credential itself.
    Completed,
    /// The credential has been revealed; all further reads land here.
    AlreadyClaimed,
    /// The deadline passed while still `Pending`. Terminal.
    Expired,
}

impl LinkStatus {
    /// Wire-format name, as it appears in HTTP responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Pending => "PENDING",
            LinkStatus::Completed => "COMPLETED",
            LinkStatus::AlreadyClaimed => "ALREADY_CLAIMED",
            LinkStatus::Expired => "EXPIRED",
        }
    }

    /// Whether no further transition out of this status exists.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkStatus::AlreadyClaimed | LinkStatus::Expired)
    }
}

// ---------------------------------------------------------------------------
// LinkRequest
// ---------------------------------------------------------------------------

/// A persisted wallet-link request.
///
/// Serialized with bincode into the `link_requests` tree, keyed by
/// `request_id`. Every field except `status` and `credential_digest` is
/// immutable after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkRequest {
    /// Opaque unique id, generated at creation, never reused.
    pub request_id: String,

    /// The account this request belongs to.
    pub owner_account_id: String,

    /// Which chain registry entry the deposit is watched on.
    pub chain_id: String,

    /// Token the deposit must be made in.
    pub token_address: String,

    /// Exact deposit size the user must send. Randomized per request so
    /// concurrent requests are distinguishable on-chain.
    pub expected_amount: u64,

    /// The service-controlled address the deposit must be sent to.
    pub deposit_to_address: String,

    /// Current claim state. See the module docs for allowed transitions.
    pub status: LinkStatus,

    /// SHA-256 hex digest of the minted API key. Set exactly once, at the
    /// same CAS that moves `status` to `Completed`; never overwritten.
    /// The key itself is never persisted.
    pub credential_digest: Option<String>,

    /// When the request was created.
    pub created_at: DateTime<Utc>,

    /// Absolute deadline. Past this instant the request is terminally
    /// expired regardless of stored status.
    pub expires_at: DateTime<Utc>,
}

impl LinkRequest {
    /// Creates a fresh `Pending` request with a random magic amount and
    /// the given TTL. The caller is expected to have already capped the
    /// TTL (see [`crate::link::initiate`]).
    pub fn new(
        owner_account_id: &str,
        chain_id: &str,
        token_address: &str,
        deposit_to_address: &str,
        ttl_seconds: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            request_id: Uuid::new_v4().to_string(),
            owner_account_id: owner_account_id.to_string(),
            chain_id: chain_id.to_string(),
            token_address: token_address.to_string(),
            expected_amount: random_magic_amount(),
            deposit_to_address: deposit_to_address.to_string(),
            status: LinkStatus::Pending,
            credential_digest: None,
            created_at: now,
            expires_at: now + ChronoDuration::seconds(ttl_seconds as i64),
        }
    }

    /// Whether the deadline has passed as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Draws a magic amount uniformly from
/// `[MAGIC_AMOUNT_BASE, MAGIC_AMOUNT_BASE + MAGIC_AMOUNT_JITTER)`.
fn random_magic_amount() -> u64 {
    let jitter = rand::thread_rng().gen_range(0..MAGIC_AMOUNT_JITTER);
    MAGIC_AMOUNT_BASE + jitter
}
