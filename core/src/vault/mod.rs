//! # Vault Provisioning
//!
//! Deterministic vault deployment: reserve a globally unique name, mine a
//! salt until the derived contract address satisfies the configured
//! policy, deploy through the chain's RPC service, and verify the chain
//! landed the contract exactly where the derivation said it would.
//!
//! Mining is the only CPU-bound work in the service and runs on tokio's
//! blocking pool with an iteration and wall-clock budget; it holds no lock
//! while it runs.

pub mod mining;
pub mod provision;

pub use mining::{derive_vault_address, mine_salt, AddressPolicy, MinedSalt};
pub use provision::{Provisioned, VaultProvisioner};
