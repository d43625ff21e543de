//! # Persistence Layer
//!
//! sled-backed storage for link requests and vault records. This module is
//! where every cross-process correctness guarantee in VaultLink actually
//! lives: the claim-once transition and the name-once reservation are both
//! single-key `compare_and_swap` operations against these stores.

pub mod db;
pub mod link_store;
pub mod vault_store;

pub use db::VaultLinkDb;
pub use link_store::{LinkRequestStore, StoredRequest};
pub use vault_store::{Reservation, VaultNameRegistry, VaultRecord, VaultState};
