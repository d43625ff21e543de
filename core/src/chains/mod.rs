//! # Chain Collaborators
//!
//! The flows in this crate touch a chain in exactly three places: checking
//! whether a magic-amount deposit landed, resolving an account's wallet
//! address, and deploying a vault contract. All three are behind traits so
//! the core never learns chain-specific ABI details — those belong to
//! whichever backend implements the trait.
//!
//! Implementations must be safe to call concurrently and must map their
//! transport failures to [`CoreError::DependencyUnavailable`] so callers
//! can retry without seeing internal detail.

pub mod dev;
pub mod registry;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::link::request::LinkRequest;

/// Resolves an account id to its primary wallet address.
///
/// Account state is owned by an upstream service; this trait is the only
/// view of it the core needs.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Returns the account's wallet address, or `None` if the account has
    /// never linked one.
    async fn owner_wallet(&self, account_id: &str) -> CoreResult<Option<String>>;
}

/// Observes deposits on one chain's ledger.
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Whether a deposit matching the request's `(token, amount, address)`
    /// fingerprint has been observed on-chain.
    ///
    /// The matching policy (confirmations, exact-amount semantics) is the
    /// backend's business; the resolver only consumes the boolean.
    async fn is_deposit_satisfied(&self, request: &LinkRequest) -> CoreResult<bool>;
}

/// Executes deploy transactions on one chain.
#[async_trait]
pub trait ChainRpcService: Send + Sync {
    /// Deploys a vault contract for `owner_address` using the mined salt
    /// and returns the address the chain reports for the new contract.
    ///
    /// The caller compares the returned address against `predicted_address`
    /// and treats any difference as fatal; backends should pass the
    /// prediction through for tracing, not for decision-making.
    async fn deploy(
        &self,
        owner_address: &str,
        salt: u64,
        predicted_address: &str,
    ) -> CoreResult<String>;
}

/// The pair of chain-scoped collaborators (plus chain-scoped constants)
/// the link and vault flows need.
#[derive(Clone)]
pub struct ChainServices {
    /// Registry key for this entry.
    pub chain_id: String,
    /// The service-controlled address users deposit magic amounts to.
    pub deposit_address: String,
    /// Deposit observation for this chain.
    pub ledger: Arc<dyn LedgerService>,
    /// Deploy execution for this chain.
    pub rpc: Arc<dyn ChainRpcService>,
}

impl fmt::Debug for ChainServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainServices")
            .field("chain_id", &self.chain_id)
            .field("deposit_address", &self.deposit_address)
            .finish_non_exhaustive()
    }
}
