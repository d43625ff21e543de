// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VaultLink — Core Library
//!
//! VaultLink does exactly two hard things and does them properly:
//!
//! 1. **Wallet linking** — a user proves control of an external wallet by
//!    depositing a uniquely-sized "magic amount" to a known address, then
//!    trades proof of that deposit for a one-time API key. The key is
//!    revealed to exactly one caller, ever, no matter how many clients
//!    poll, retry, or race each other across server processes.
//!
//! 2. **Vault provisioning** — a vault contract is deployed at an address
//!    we computed *before* deploying it, by brute-forcing a salt until the
//!    deterministic derivation hits a configured target. Names are globally
//!    unique, reservations are atomic, and a deployed address that doesn't
//!    match the prediction is treated as the bug it is.
//!
//! Everything else — revenue dashboards, model catalogs, Discord bots —
//! lives in other repos and talks to this one over HTTP. Good fences.
//!
//! ## Architecture
//!
//! - **config** — Constants. TTLs, mining budgets, key prefixes.
//! - **error** — One error taxonomy for the whole service.
//! - **storage** — sled-backed stores. Every cross-process guarantee in
//!   this crate bottoms out in a single-key `compare_and_swap` here.
//! - **link** — Link request lifecycle: initiate, poll, claim-once.
//! - **chains** — Chain-indexed collaborator registry and the traits the
//!   opaque ledger/RPC/account services must implement.
//! - **vault** — Salt mining and the provisioning pipeline.
//!
//! ## Design Philosophy
//!
//! 1. No in-process lock is ever load-bearing. Correctness lives in the
//!    store, because the store is the only thing all processes share.
//! 2. A credential is revealed once or not at all. There is no third mode.
//! 3. If the chain hands back an address we didn't predict, we fail loudly.

pub mod chains;
pub mod config;
pub mod error;
pub mod link;
pub mod storage;
pub mod vault;

pub use error::{CoreError, CoreResult};
