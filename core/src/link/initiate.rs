//! # Link Request Initiation
//!
//! Creates a fresh `Pending` link request: a new id, a magic amount no
//! other in-flight request shares by construction of the jitter window,
//! and a capped TTL. The write is a single insert-if-absent — either the
//! whole record lands or nothing does.

use std::sync::Arc;

use crate::chains::registry::ChainServiceRegistry;
use crate::config::{DEFAULT_LINK_TTL_SECS, DEFAULT_TOKEN_ADDRESS, MAX_LINK_TTL_SECS};
use crate::error::CoreResult;
use crate::link::request::LinkRequest;
use crate::storage::LinkRequestStore;

/// Creates link requests.
#[derive(Clone)]
pub struct LinkRequestInitiator {
    store: LinkRequestStore,
    chains: Arc<ChainServiceRegistry>,
}

impl LinkRequestInitiator {
    /// Wires an initiator over the request store and chain registry.
    pub fn new(store: LinkRequestStore, chains: Arc<ChainServiceRegistry>) -> Self {
        Self { store, chains }
    }

    /// Creates and persists a new `Pending` link request for the account.
    ///
    /// `token_address` defaults to the chain's native asset; `ttl_seconds`
    /// defaults to [`DEFAULT_LINK_TTL_SECS`] and is capped at
    /// [`MAX_LINK_TTL_SECS`]. Short TTLs are honored as given. Fails with
    /// `DependencyUnavailable` if the store is unreachable; never leaves a
    /// partial record behind.
    pub fn initiate(
        &self,
        owner_account_id: &str,
        token_address: Option<&str>,
        ttl_seconds: Option<u64>,
        chain_id: Option<&str>,
    ) -> CoreResult<LinkRequest> {
        let chain = self.chains.resolve(chain_id)?;
        let token = match token_address {
            Some(t) if !t.trim().is_empty() => t.trim(),
            _ => DEFAULT_TOKEN_ADDRESS,
        };
        let ttl = cap_ttl(ttl_seconds);

        let request = LinkRequest::new(
            owner_account_id,
            &chain.chain_id,
            token,
            &chain.deposit_address,
            ttl,
        );
        self.store.insert_new(&request)?;

        tracing::info!(
            request_id = %request.request_id,
            account = owner_account_id,
            chain_id = %chain.chain_id,
            ttl_seconds = ttl,
            "link request initiated"
        );
        Ok(request)
    }
}

/// Applies the default and the ceiling to a caller-supplied TTL.
fn cap_ttl(ttl_seconds: Option<u64>) -> u64 {
    ttl_seconds
        .unwrap_or(DEFAULT_LINK_TTL_SECS)
        .min(MAX_LINK_TTL_SECS)
}
