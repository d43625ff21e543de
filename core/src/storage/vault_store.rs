//! # Vault Name Registry
//!
//! Global uniqueness of human-chosen vault names, enforced where it can
//! actually be enforced: a single insert-if-absent against the `vaults`
//! tree. Two processes racing to reserve the same name both issue the same
//! CAS and sled lets exactly one of them through — there is no
//! check-then-insert window to lose.
//!
//! A reservation is written *before* salt mining starts, so the expensive
//! CPU work never runs for a name that is already spoken for. If anything
//! downstream fails (no wallet, mining timeout, deploy failure, address
//! mismatch), the reservation is released so the name isn't permanently
//! wasted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::{IVec, Tree};

use crate::error::{CoreError, CoreResult};
use crate::storage::db::VaultLinkDb;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Lifecycle state of a vault name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultState {
    /// Name is held while mining and deployment are in flight.
    Reserved,
    /// Contract deployed and verified; the record is final.
    Deployed,
}

/// Persisted vault record, keyed by `vault_name` in the `vaults` tree.
///
/// `salt`, `predicted_address`, and `deployed_at` are `None` while the
/// record is merely `Reserved` and are filled in by the single finalize
/// CAS that flips the state to `Deployed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Globally unique, case-sensitive name chosen by the owner.
    pub vault_name: String,
    /// The account that requested provisioning.
    pub owner_account_id: String,
    /// The wallet address that owns the on-chain contract. Resolved after
    /// reservation, so only present once the record is `Deployed`.
    pub owner_address: Option<String>,
    /// Which chain registry entry was used.
    pub chain_id: String,
    /// The mined salt, once mining succeeded.
    pub salt: Option<u64>,
    /// The address derived from `(owner_address, salt)` ahead of deploy.
    pub predicted_address: Option<String>,
    /// Reservation vs. final state.
    pub state: VaultState,
    /// When the name was reserved.
    pub reserved_at: DateTime<Utc>,
    /// When deployment was verified, for `Deployed` records.
    pub deployed_at: Option<DateTime<Utc>>,
}

/// A successful reservation: the record plus its CAS witness bytes.
///
/// All further mutation of the name (finalize or release) goes through
/// this token, so only the provisioning attempt that won the reservation
/// can move it.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// The reserved record as written.
    pub record: VaultRecord,
    raw: IVec,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// sled-backed registry of vault names.
#[derive(Clone, Debug)]
pub struct VaultNameRegistry {
    tree: Tree,
}

impl VaultNameRegistry {
    /// Builds a registry over the database's `vaults` tree.
    pub fn new(db: &VaultLinkDb) -> Self {
        Self {
            tree: db.vaults().clone(),
        }
    }

    /// Atomically reserves `vault_name` for the given account on the given
    /// chain.
    ///
    /// Implemented as a single `compare_and_swap` expecting absence. Fails
    /// with [`CoreError::NameTaken`] if any record — reserved or deployed —
    /// already holds the name.
    pub fn reserve(
        &self,
        vault_name: &str,
        owner_account_id: &str,
        chain_id: &str,
    ) -> CoreResult<Reservation> {
        let record = VaultRecord {
            vault_name: vault_name.to_string(),
            owner_account_id: owner_account_id.to_string(),
            owner_address: None,
            chain_id: chain_id.to_string(),
            salt: None,
            predicted_address: None,
            state: VaultState::Reserved,
            reserved_at: Utc::now(),
            deployed_at: None,
        };
        let bytes = bincode::serialize(&record)?;
        self.tree
            .compare_and_swap(vault_name.as_bytes(), None::<&[u8]>, Some(bytes.clone()))?
            .map_err(|_| CoreError::NameTaken(vault_name.to_string()))?;

        Ok(Reservation {
            record,
            raw: IVec::from(bytes),
        })
    }

    /// Releases a reservation after a failed provisioning attempt, freeing
    /// the name for retries.
    ///
    /// The removal is conditional on the reservation bytes, so a record
    /// that has since been finalized (or re-reserved after an earlier
    /// release) is never deleted by a stale attempt. Returns whether the
    /// release actually removed the record.
    pub fn release(&self, reservation: &Reservation) -> CoreResult<bool> {
        let outcome = self.tree.compare_and_swap(
            reservation.record.vault_name.as_bytes(),
            Some(&reservation.raw),
            None::<&[u8]>,
        )?;
        Ok(outcome.is_ok())
    }

    /// Finalizes a reservation into a `Deployed` record.
    ///
    /// CAS over the exact reserved bytes; returns `Ok(false)` if the
    /// reservation was moved by someone else, which the provisioner treats
    /// as an internal inconsistency (reservations have a single logical
    /// owner).
    pub fn finalize(
        &self,
        reservation: &Reservation,
        owner_address: &str,
        salt: u64,
        predicted_address: &str,
    ) -> CoreResult<bool> {
        let mut record = reservation.record.clone();
        record.owner_address = Some(owner_address.to_string());
        record.salt = Some(salt);
        record.predicted_address = Some(predicted_address.to_string());
        record.state = VaultState::Deployed;
        record.deployed_at = Some(Utc::now());

        let bytes = bincode::serialize(&record)?;
        let outcome = self.tree.compare_and_swap(
            reservation.record.vault_name.as_bytes(),
            Some(&reservation.raw),
            Some(bytes),
        )?;
        Ok(outcome.is_ok())
    }

    /// Looks up the record for a name, reserved or deployed.
    pub fn get(&self, vault_name: &str) -> CoreResult<Option<VaultRecord>> {
        match self.tree.get(vault_name.as_bytes())? {
            Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}
