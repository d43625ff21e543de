//! # VaultLinkDb — Persistent Storage Engine
//!
//! The persistence layer for VaultLink, built on sled's embedded key-value
//! store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees" (analogous to column families in
//! RocksDB or tables in SQL). Each tree is an independent B+ tree with its
//! own keyspace:
//!
//! | Tree            | Key                    | Value                    |
//! |-----------------|------------------------|--------------------------|
//! | `link_requests` | `request_id` (UTF-8)   | `bincode(LinkRequest)`   |
//! | `vaults`        | `vault_name` (UTF-8)   | `bincode(VaultRecord)`   |
//! | `dev_deposits`  | `request_id` (UTF-8)   | `1` (presence marker)    |
//!
//! ## Atomicity
//!
//! The stores built on these trees never do read-then-write. Every state
//! transition is a `compare_and_swap` keyed on the exact bytes previously
//! read (or on absence, for insert-if-absent), so concurrent writers from
//! any number of server processes serialize at the sled layer and exactly
//! one of them wins. sled persists CAS outcomes to its log, which is the
//! whole point: the log is the only coordination shared by all processes.

use sled::{Db, Tree};
use std::path::Path;

use crate::error::CoreResult;

/// Persistent storage engine for VaultLink.
///
/// Wraps a sled `Db` handle and exposes the named trees the stores are
/// built on. All value serialization uses bincode.
///
/// # Thread Safety
///
/// sled is inherently thread-safe — trees support lock-free concurrent
/// reads and serialized writes. `VaultLinkDb` can be shared across tasks
/// via `Arc<VaultLinkDb>` or plain `Clone` without external locking.
#[derive(Debug, Clone)]
pub struct VaultLinkDb {
    /// The underlying sled database handle.
    db: Db,
    /// In-flight and settled wallet-link requests, keyed by request id.
    link_requests: Tree,
    /// Vault name reservations and deployed vault records, keyed by name.
    vaults: Tree,
    /// Dev-mode deposit markers consumed by the dev ledger service.
    dev_deposits: Tree,
}

impl VaultLinkDb {
    /// Open or create a database at the given filesystem path.
    ///
    /// If the directory doesn't exist, sled creates it. If the database
    /// already exists it's opened and all existing data is available
    /// immediately.
    pub fn open<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that lives in memory and is cleaned up
    /// automatically on drop.
    ///
    /// Ideal for unit tests — no filesystem side effects, no cleanup.
    pub fn open_temporary() -> CoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    /// Internal constructor: opens named trees from an existing sled `Db`.
    fn from_db(db: Db) -> CoreResult<Self> {
        let link_requests = db.open_tree("link_requests")?;
        let vaults = db.open_tree("vaults")?;
        let dev_deposits = db.open_tree("dev_deposits")?;
        Ok(Self {
            db,
            link_requests,
            vaults,
            dev_deposits,
        })
    }

    /// The tree holding link requests.
    pub fn link_requests(&self) -> &Tree {
        &self.link_requests
    }

    /// The tree holding vault reservations and records.
    pub fn vaults(&self) -> &Tree {
        &self.vaults
    }

    /// The tree holding dev-mode deposit markers.
    pub fn dev_deposits(&self) -> &Tree {
        &self.dev_deposits
    }

    /// Flush all buffered writes to disk.
    ///
    /// sled buffers writes in memory for performance. Call this on
    /// graceful shutdown so the last few operations are durable.
    pub fn flush(&self) -> CoreResult<usize> {
        Ok(self.db.flush()?)
    }
}
