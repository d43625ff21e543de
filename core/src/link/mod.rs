//! # Wallet Linking
//!
//! The link flow in full: a client calls initiate and receives a request
//! id plus a uniquely-sized "magic amount"; the user deposits exactly that
//! amount to the service's deposit address; the client polls the resolver
//! until the deposit is observed on-chain; the first poll to see the
//! satisfied deposit — and only that poll — receives a freshly minted
//! one-time API key.
//!
//! The at-most-once guarantee does not depend on any in-process state.
//! See [`claim::LinkClaimResolver`] for the state machine.

pub mod claim;
pub mod credential;
pub mod initiate;
pub mod request;

pub use claim::{ClaimOutcome, LinkClaimResolver};
pub use initiate::LinkRequestInitiator;
pub use request::{LinkRequest, LinkStatus};
