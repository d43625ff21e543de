//! # Dev Chain Backends
//!
//! In-process implementations of the chain collaborator traits, used by
//! the server's `--dev` mode and by the test suite. They are honest about
//! the contracts — deposits really are observed through the shared store,
//! deploys really do land at the derived address — so the flows exercise
//! the same code paths they would against a real chain backend.
//!
//! The deploy implementation computes the contract address with the same
//! derivation the salt miner uses, which is exactly what a real CREATE2-
//! style factory gives you: the address is a pure function of owner and
//! salt. [`DevChainRpc::misdeployed`] deliberately breaks that property
//! for exercising the address-mismatch abort path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::chains::{AccountDirectory, ChainRpcService, LedgerService};
use crate::error::{CoreError, CoreResult};
use crate::link::request::LinkRequest;
use crate::storage::VaultLinkDb;
use crate::vault::mining::derive_vault_address;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Dev ledger: a deposit is "satisfied" once its request id has been
/// marked in the `dev_deposits` tree.
///
/// Backing the markers with sled (rather than process memory) keeps the
/// dev backend faithful to the multi-process model — a deposit marked via
/// one process is visible to every other process sharing the data dir.
#[derive(Clone, Debug)]
pub struct DevLedgerService {
    deposits: sled::Tree,
}

impl DevLedgerService {
    /// Builds a dev ledger over the database's `dev_deposits` tree.
    pub fn new(db: &VaultLinkDb) -> Self {
        Self {
            deposits: db.dev_deposits().clone(),
        }
    }

    /// Marks the deposit for `request_id` as observed.
    pub fn mark_satisfied(&self, request_id: &str) -> CoreResult<()> {
        self.deposits.insert(request_id.as_bytes(), &[1u8])?;
        Ok(())
    }
}

#[async_trait]
impl LedgerService for DevLedgerService {
    async fn is_deposit_satisfied(&self, request: &LinkRequest) -> CoreResult<bool> {
        Ok(self.deposits.get(request.request_id.as_bytes())?.is_some())
    }
}

// ---------------------------------------------------------------------------
// Account directory
// ---------------------------------------------------------------------------

/// Dev account directory with explicitly registered wallets, optionally
/// deriving a deterministic wallet for unregistered accounts.
///
/// Tests use explicit registration so the no-wallet path stays reachable;
/// the `--dev` server derives wallets for everyone so any account id works
/// out of the box.
#[derive(Debug, Default)]
pub struct DevAccountDirectory {
    wallets: RwLock<HashMap<String, String>>,
    derive_unknown: bool,
}

impl DevAccountDirectory {
    /// Directory that only knows explicitly registered accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that derives a deterministic wallet for any account.
    pub fn with_derived_wallets() -> Self {
        Self {
            wallets: RwLock::new(HashMap::new()),
            derive_unknown: true,
        }
    }

    /// Registers (or replaces) an account's wallet address.
    pub fn register(&self, account_id: &str, wallet_address: &str) {
        self.wallets
            .write()
            .expect("wallet map poisoned")
            .insert(account_id.to_string(), wallet_address.to_string());
    }
}

#[async_trait]
impl AccountDirectory for DevAccountDirectory {
    async fn owner_wallet(&self, account_id: &str) -> CoreResult<Option<String>> {
        let registered = self
            .wallets
            .read()
            .expect("wallet map poisoned")
            .get(account_id)
            .cloned();
        if registered.is_some() {
            return Ok(registered);
        }
        if self.derive_unknown {
            let digest = blake3::Hasher::new()
                .update(b"vaultlink:dev-wallet:v1")
                .update(account_id.as_bytes())
                .finalize();
            return Ok(Some(format!("0x{}", hex::encode(&digest.as_bytes()[..20]))));
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Chain RPC
// ---------------------------------------------------------------------------

/// How the dev RPC reports deployed addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeployMode {
    /// Deploys land where the derivation says they will.
    Faithful,
    /// Deploys report a wrong address. For mismatch-path tests only.
    Misdeployed,
}

/// Dev deploy backend.
#[derive(Clone, Debug)]
pub struct DevChainRpc {
    mode: DeployMode,
}

impl DevChainRpc {
    /// A backend whose deploys always match the prediction.
    pub fn faithful() -> Self {
        Self {
            mode: DeployMode::Faithful,
        }
    }

    /// A backend whose deploys never match the prediction.
    pub fn misdeployed() -> Self {
        Self {
            mode: DeployMode::Misdeployed,
        }
    }
}

#[async_trait]
impl ChainRpcService for DevChainRpc {
    async fn deploy(
        &self,
        owner_address: &str,
        salt: u64,
        _predicted_address: &str,
    ) -> CoreResult<String> {
        if owner_address.is_empty() {
            return Err(CoreError::InvalidInput("empty owner address".into()));
        }
        match self.mode {
            DeployMode::Faithful => Ok(derive_vault_address(owner_address, salt)),
            DeployMode::Misdeployed => {
                // Same shape, guaranteed different value.
                Ok(derive_vault_address(owner_address, salt.wrapping_add(1)))
            }
        }
    }
}
