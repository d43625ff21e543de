//! # Claim Resolution — the exactly-once hand-off
//!
//! This is the hard part of the repo. Any number of clients poll the same
//! request id from any number of server processes, and the API key must
//! appear in exactly one response across the entire history. There is no
//! lock to take: every transition is a compare-and-swap against the store,
//! and losing a swap just means someone else moved the record first — the
//! loser re-reads and lands in the post-transition branch.
//!
//! ```text
//! loop {
//!     read (record, witness)
//!     Pending, past deadline      → CAS to Expired, return Expired
//!     Pending, deposit satisfied  → mint key, CAS to Completed
//!                                   (digest only); winner returns the key
//!     Pending, no deposit         → return Pending
//!     Completed                   → CAS to AlreadyClaimed, return it
//!     AlreadyClaimed / Expired    → return as-is
//! }
//! ```
//!
//! Note what the `Completed` branch buys: even if two callers raced the
//! `Pending → Completed` swap, only the swap winner holds a key. Everyone
//! who merely *observes* `Completed` afterwards flips it to
//! `AlreadyClaimed` and gets no key, so the single-reveal guarantee sits
//! in the store transition, not in anyone's memory.
//!
//! The loop terminates because statuses only move forward, so each lost
//! swap lands in a branch strictly closer to a terminal state.

use chrono::Utc;
use std::sync::Arc;

use crate::chains::registry::ChainServiceRegistry;
use crate::error::{CoreError, CoreResult};
use crate::link::credential;
use crate::link::request::{LinkRequest, LinkStatus};
use crate::storage::LinkRequestStore;

/// What a single `resolve_and_claim` call observed.
#[derive(Clone, Debug)]
pub struct ClaimOutcome {
    /// The status as of this call.
    pub status: LinkStatus,
    /// The one-time API key. Present iff this call won the
    /// `Pending → Completed` transition.
    pub api_key: Option<String>,
}

impl ClaimOutcome {
    fn status_only(status: LinkStatus) -> Self {
        Self {
            status,
            api_key: None,
        }
    }
}

/// Resolves link request status and performs the exactly-once credential
/// hand-off.
#[derive(Clone)]
pub struct LinkClaimResolver {
    store: LinkRequestStore,
    chains: Arc<ChainServiceRegistry>,
}

impl LinkClaimResolver {
    /// Wires a resolver over the request store and chain registry.
    pub fn new(store: LinkRequestStore, chains: Arc<ChainServiceRegistry>) -> Self {
        Self { store, chains }
    }

    /// Resolves the request's status, claiming the credential if this call
    /// is the one that observes the deposit first.
    ///
    /// Safe to call arbitrarily many times; idempotent everywhere except
    /// the single reveal.
    pub async fn resolve_and_claim(&self, request_id: &str) -> CoreResult<ClaimOutcome> {
        loop {
            let stored = self
                .store
                .load(request_id)?
                .ok_or_else(|| CoreError::NotFound(format!("link request {request_id}")))?;
            let record = &stored.record;

            match record.status {
                LinkStatus::Pending => {
                    // Expiry is checked before the deposit: a deadline that
                    // has passed wins even if the deposit shows up later.
                    if record.is_expired_at(Utc::now()) {
                        let mut next = record.clone();
                        next.status = LinkStatus::Expired;
                        if self.store.swap(&stored, &next)? {
                            tracing::debug!(request_id, "link request expired");
                            return Ok(ClaimOutcome::status_only(LinkStatus::Expired));
                        }
                        continue;
                    }

                    let chain = self.chains.resolve(Some(&record.chain_id))?;
                    if !chain.ledger.is_deposit_satisfied(record).await? {
                        return Ok(ClaimOutcome::status_only(LinkStatus::Pending));
                    }

                    let api_key = credential::mint_api_key();
                    let mut next = record.clone();
                    next.status = LinkStatus::Completed;
                    next.credential_digest = Some(credential::digest_of(&api_key));

                    if self.store.swap(&stored, &next)? {
                        tracing::info!(request_id, "deposit observed, credential claimed");
                        return Ok(ClaimOutcome {
                            status: LinkStatus::Completed,
                            api_key: Some(api_key),
                        });
                    }
                    // Lost the claim race. The minted key is dropped here
                    // and never seen again; re-read to observe the winner.
                    continue;
                }

                LinkStatus::Completed => {
                    let mut next = record.clone();
                    next.status = LinkStatus::AlreadyClaimed;
                    if self.store.swap(&stored, &next)? {
                        return Ok(ClaimOutcome::status_only(LinkStatus::AlreadyClaimed));
                    }
                    continue;
                }

                LinkStatus::AlreadyClaimed => {
                    return Ok(ClaimOutcome::status_only(LinkStatus::AlreadyClaimed));
                }

                LinkStatus::Expired => {
                    return Ok(ClaimOutcome::status_only(LinkStatus::Expired));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::dev::{DevChainRpc, DevLedgerService};
    use crate::chains::ChainServices;
    use crate::storage::VaultLinkDb;
    use chrono::Duration as ChronoDuration;

    struct Fixture {
        resolver: LinkClaimResolver,
        store: LinkRequestStore,
        ledger: DevLedgerService,
    }

    fn fixture() -> Fixture {
        let db = VaultLinkDb::open_temporary().expect("temp db");
        let store = LinkRequestStore::new(&db);
        let ledger = DevLedgerService::new(&db);

        let mut chains = ChainServiceRegistry::new();
        chains.register(ChainServices {
            chain_id: "1".into(),
            deposit_address: "0xdeposit".into(),
            ledger: Arc::new(ledger.clone()),
            rpc: Arc::new(DevChainRpc::faithful()),
        });

        Fixture {
            resolver: LinkClaimResolver::new(store.clone(), Arc::new(chains)),
            store,
            ledger,
        }
    }

    fn insert_pending(fx: &Fixture) -> LinkRequest {
        let req = LinkRequest::new("acct_1", "1", "0xtoken", "0xdeposit", 900);
        fx.store.insert_new(&req).expect("insert");
        req
    }

    fn insert_expired(fx: &Fixture) -> LinkRequest {
        let mut req = LinkRequest::new("acct_1", "1", "0xtoken", "0xdeposit", 900);
        req.expires_at = Utc::now() - ChronoDuration::seconds(1);
        fx.store.insert_new(&req).expect("insert");
        req
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let fx = fixture();
        let result = fx.resolver.resolve_and_claim("nope").await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn pending_until_deposit_lands() {
        let fx = fixture();
        let req = insert_pending(&fx);

        for _ in 0..3 {
            let outcome = fx.resolver.resolve_and_claim(&req.request_id).await.unwrap();
            assert_eq!(outcome.status, LinkStatus::Pending);
            assert!(outcome.api_key.is_none());
        }
    }

    #[tokio::test]
    async fn claim_lifecycle_reveals_the_key_exactly_once() {
        let fx = fixture();
        let req = insert_pending(&fx);
        fx.ledger.mark_satisfied(&req.request_id).expect("mark");

        // First poll after the deposit: key revealed.
        let first = fx.resolver.resolve_and_claim(&req.request_id).await.unwrap();
        assert_eq!(first.status, LinkStatus::Completed);
        let key = first.api_key.expect("key revealed once");

        // Stored digest matches the revealed key; the key itself is not stored.
        let stored = fx.store.load(&req.request_id).unwrap().unwrap();
        assert_eq!(
            stored.record.credential_digest.as_deref(),
            Some(credential::digest_of(&key).as_str())
        );

        // Second poll: AlreadyClaimed, no key.
        let second = fx.resolver.resolve_and_claim(&req.request_id).await.unwrap();
        assert_eq!(second.status, LinkStatus::AlreadyClaimed);
        assert!(second.api_key.is_none());

        // And idempotently thereafter.
        let third = fx.resolver.resolve_and_claim(&req.request_id).await.unwrap();
        assert_eq!(third.status, LinkStatus::AlreadyClaimed);
        assert!(third.api_key.is_none());
    }

    #[tokio::test]
    async fn past_deadline_resolves_expired_on_next_read() {
        let fx = fixture();
        let req = insert_expired(&fx);

        let outcome = fx.resolver.resolve_and_claim(&req.request_id).await.unwrap();
        assert_eq!(outcome.status, LinkStatus::Expired);
        assert!(outcome.api_key.is_none());
    }

    #[tokio::test]
    async fn expiry_wins_even_if_deposit_becomes_true() {
        let fx = fixture();
        let req = insert_expired(&fx);
        fx.ledger.mark_satisfied(&req.request_id).expect("mark");

        let outcome = fx.resolver.resolve_and_claim(&req.request_id).await.unwrap();
        assert_eq!(outcome.status, LinkStatus::Expired);

        // Still expired on every later read, deposit or no deposit.
        let again = fx.resolver.resolve_and_claim(&req.request_id).await.unwrap();
        assert_eq!(again.status, LinkStatus::Expired);
        assert!(again.api_key.is_none());
    }

    #[tokio::test]
    async fn unsatisfied_deposit_never_mints_before_expiry() {
        let fx = fixture();
        let req = insert_expired(&fx);

        let outcome = fx.resolver.resolve_and_claim(&req.request_id).await.unwrap();
        assert_eq!(outcome.status, LinkStatus::Expired);

        let stored = fx.store.load(&req.request_id).unwrap().unwrap();
        assert!(stored.record.credential_digest.is_none());
    }

    #[tokio::test]
    async fn n_concurrent_claims_reveal_exactly_one_key() {
        let fx = fixture();
        let req = insert_pending(&fx);
        fx.ledger.mark_satisfied(&req.request_id).expect("mark");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let resolver = fx.resolver.clone();
            let id = req.request_id.clone();
            handles.push(tokio::spawn(async move {
                resolver.resolve_and_claim(&id).await
            }));
        }

        let mut keys = Vec::new();
        for handle in handles {
            let outcome = handle.await.expect("join").expect("resolve");
            match outcome.status {
                LinkStatus::Completed => {
                    keys.push(outcome.api_key.expect("winner carries the key"));
                }
                LinkStatus::AlreadyClaimed => assert!(outcome.api_key.is_none()),
                other => panic!("unexpected status {other:?}"),
            }
        }
        assert_eq!(keys.len(), 1, "exactly one response across the history carries the key");

        // The stored digest belongs to the one revealed key.
        let stored = fx.store.load(&req.request_id).unwrap().unwrap();
        assert_eq!(
            stored.record.credential_digest.as_deref(),
            Some(credential::digest_of(&keys[0]).as_str())
        );
    }
}
