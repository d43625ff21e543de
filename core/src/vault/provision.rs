//! # Vault Provisioner
//!
//! Orchestrates the full provisioning pipeline:
//!
//! ```text
//! reserve name ─► resolve owner wallet ─► mine salt ─► deploy ─► verify ─► finalize
//! ```
//!
//! The name is reserved *first* so no concurrent request for the same name
//! gets past step one, and released on every failure after that point so a
//! failed attempt never wastes the name. The reservation and the final
//! record are mutated only through the CAS witness handed back by the
//! registry — a retry of a failed deployment starts over at `reserve`,
//! which re-checks the name state before any redeploy can happen.
//!
//! Mining runs on tokio's blocking pool so a vanity-heavy policy cannot
//! starve the async workers serving other requests.

use std::sync::Arc;

use crate::chains::registry::ChainServiceRegistry;
use crate::chains::AccountDirectory;
use crate::error::{CoreError, CoreResult};
use crate::storage::vault_store::{Reservation, VaultNameRegistry};
use crate::vault::mining::{mine_salt, AddressPolicy, MinedSalt};

/// A successfully provisioned vault, as returned to the API layer.
#[derive(Clone, Debug)]
pub struct Provisioned {
    /// The now-permanently-owned vault name.
    pub vault_name: String,
    /// Wallet address that owns the deployed contract.
    pub owner_address: String,
    /// Where the contract was deployed — verified equal to the mined
    /// prediction before this struct is ever constructed.
    pub predicted_address: String,
    /// The mined salt.
    pub salt: u64,
    /// Chain the vault lives on.
    pub chain_id: String,
}

/// Drives vault provisioning end to end.
#[derive(Clone)]
pub struct VaultProvisioner {
    names: VaultNameRegistry,
    accounts: Arc<dyn AccountDirectory>,
    chains: Arc<ChainServiceRegistry>,
    policy: AddressPolicy,
}

impl VaultProvisioner {
    /// Wires a provisioner over its collaborators.
    pub fn new(
        names: VaultNameRegistry,
        accounts: Arc<dyn AccountDirectory>,
        chains: Arc<ChainServiceRegistry>,
        policy: AddressPolicy,
    ) -> Self {
        Self {
            names,
            accounts,
            chains,
            policy,
        }
    }

    /// Provisions a vault named `vault_name` for `owner_account_id` on the
    /// given chain (default chain when absent).
    ///
    /// Exactly one concurrent call per name can succeed; the rest fail
    /// with [`CoreError::NameTaken`]. Success guarantees the deployed
    /// address equals the mined prediction.
    pub async fn provision(
        &self,
        owner_account_id: &str,
        vault_name: &str,
        chain_id: Option<&str>,
    ) -> CoreResult<Provisioned> {
        let vault_name = vault_name.trim();
        if vault_name.is_empty() {
            return Err(CoreError::InvalidInput("vault name must not be empty".into()));
        }
        if vault_name.len() > 64 {
            return Err(CoreError::InvalidInput(
                "vault name longer than 64 characters".into(),
            ));
        }

        // The chain id goes into the reservation record, so resolve it
        // before reserving. Failing here costs nothing.
        let chain = self.chains.resolve(chain_id)?;

        let reservation = self
            .names
            .reserve(vault_name, owner_account_id, &chain.chain_id)?;
        tracing::debug!(vault_name, chain_id = %chain.chain_id, "vault name reserved");

        let owner_address = match self.accounts.owner_wallet(owner_account_id).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                return Err(self.fail_released(
                    &reservation,
                    CoreError::WalletNotFound(owner_account_id.to_string()),
                ));
            }
            Err(e) => return Err(self.fail_released(&reservation, e)),
        };

        let mined = match self.mine(&owner_address).await {
            Ok(mined) => mined,
            Err(e) => return Err(self.fail_released(&reservation, e)),
        };
        tracing::info!(
            vault_name,
            predicted = %mined.address,
            iterations = mined.iterations,
            "salt mined"
        );

        let deployed = match chain
            .rpc
            .deploy(&owner_address, mined.salt, &mined.address)
            .await
        {
            Ok(address) => address,
            Err(e) => return Err(self.fail_released(&reservation, e)),
        };

        if deployed != mined.address {
            // Derivation and chain disagree. This is a bug somewhere in the
            // mining/deploy pair and must surface loudly.
            tracing::error!(
                vault_name,
                predicted = %mined.address,
                deployed = %deployed,
                "deployed vault address does not match prediction"
            );
            return Err(self.fail_released(
                &reservation,
                CoreError::AddressMismatch {
                    predicted: mined.address,
                    deployed,
                },
            ));
        }

        if !self
            .names
            .finalize(&reservation, &owner_address, mined.salt, &mined.address)?
        {
            // Reservations have a single logical owner; losing this CAS
            // means the record was mutated out from under us.
            return Err(CoreError::Internal(format!(
                "reservation for {vault_name} moved during provisioning"
            )));
        }

        tracing::info!(vault_name, address = %mined.address, chain_id = %chain.chain_id, "vault provisioned");
        Ok(Provisioned {
            vault_name: vault_name.to_string(),
            owner_address,
            predicted_address: mined.address,
            salt: mined.salt,
            chain_id: chain.chain_id.clone(),
        })
    }

    /// Runs the miner on the blocking pool.
    async fn mine(&self, owner_address: &str) -> CoreResult<MinedSalt> {
        let owner = owner_address.to_string();
        let policy = self.policy.clone();
        tokio::task::spawn_blocking(move || mine_salt(&owner, &policy))
            .await
            .map_err(|e| CoreError::Internal(format!("mining task panicked: {e}")))?
    }

    /// Releases the reservation and hands the original error back.
    fn fail_released(&self, reservation: &Reservation, err: CoreError) -> CoreError {
        match self.names.release(reservation) {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                vault_name = %reservation.record.vault_name,
                "reservation already moved when releasing after failure"
            ),
            Err(release_err) => tracing::warn!(
                vault_name = %reservation.record.vault_name,
                error = %release_err,
                "failed to release reservation after provisioning failure"
            ),
        }
        err
    }
}
