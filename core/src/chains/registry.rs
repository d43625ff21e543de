//! # Chain Service Registry
//!
//! Maps chain identifiers to their [`ChainServices`] pair. Populated once
//! at process start and queried by value afterwards — a plain `HashMap`
//! behind `Arc`, no interior mutability needed.
//!
//! Lookup policy, per the API contract: an absent or empty chain id means
//! the default chain (`"1"`); any *other* id must be registered or the
//! lookup fails with [`CoreError::UnknownChain`]. The default is never
//! used as a fallback for an arbitrary unknown key — that would silently
//! point a caller's deposit watch or contract deploy at the wrong chain.

use std::collections::HashMap;
use std::sync::Arc;

use crate::chains::ChainServices;
use crate::config::DEFAULT_CHAIN_ID;
use crate::error::{CoreError, CoreResult};

/// Immutable chain id → services lookup table.
#[derive(Debug, Default)]
pub struct ChainServiceRegistry {
    services: HashMap<String, Arc<ChainServices>>,
}

impl ChainServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a chain's services under its `chain_id`.
    ///
    /// Last write wins; registration happens once at startup so collisions
    /// indicate a wiring bug rather than a runtime race.
    pub fn register(&mut self, services: ChainServices) {
        self.services
            .insert(services.chain_id.clone(), Arc::new(services));
    }

    /// Resolves a caller-supplied chain id to its services.
    ///
    /// `None` or an empty/whitespace id resolves to the default chain.
    pub fn resolve(&self, chain_id: Option<&str>) -> CoreResult<Arc<ChainServices>> {
        let key = match chain_id {
            Some(id) if !id.trim().is_empty() => id.trim(),
            _ => DEFAULT_CHAIN_ID,
        };
        self.services
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::UnknownChain(key.to_string()))
    }

    /// Chain ids currently registered, for startup logging.
    pub fn chain_ids(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::dev::{DevChainRpc, DevLedgerService};
    use crate::storage::VaultLinkDb;

    fn dev_services(chain_id: &str) -> ChainServices {
        let db = VaultLinkDb::open_temporary().expect("temp db");
        ChainServices {
            chain_id: chain_id.to_string(),
            deposit_address: "0xdeposit".to_string(),
            ledger: Arc::new(DevLedgerService::new(&db)),
            rpc: Arc::new(DevChainRpc::faithful()),
        }
    }

    #[test]
    fn resolves_registered_chain() {
        let mut reg = ChainServiceRegistry::new();
        reg.register(dev_services("1"));
        reg.register(dev_services("8453"));

        let services = reg.resolve(Some("8453")).expect("resolve");
        assert_eq!(services.chain_id, "8453");
    }

    #[test]
    fn absent_and_empty_ids_use_default() {
        let mut reg = ChainServiceRegistry::new();
        reg.register(dev_services(DEFAULT_CHAIN_ID));

        assert_eq!(reg.resolve(None).expect("none").chain_id, "1");
        assert_eq!(reg.resolve(Some("")).expect("empty").chain_id, "1");
        assert_eq!(reg.resolve(Some("  ")).expect("blank").chain_id, "1");
    }

    #[test]
    fn unknown_chain_never_falls_back() {
        let mut reg = ChainServiceRegistry::new();
        reg.register(dev_services(DEFAULT_CHAIN_ID));

        let result = reg.resolve(Some("999"));
        assert!(matches!(result, Err(CoreError::UnknownChain(id)) if id == "999"));
    }

    #[test]
    fn empty_registry_reports_default_as_unknown() {
        let reg = ChainServiceRegistry::new();
        assert!(matches!(
            reg.resolve(None),
            Err(CoreError::UnknownChain(id)) if id == DEFAULT_CHAIN_ID
        ));
    }
}
