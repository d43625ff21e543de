//! # Link Request Store
//!
//! sled-backed store for [`LinkRequest`] records. The store's API is built
//! so that read-then-write is impossible to express: a caller reads a
//! [`StoredRequest`] (record plus the exact bytes it came from) and can
//! only write by swapping against those bytes. If any other process moved
//! the record in between, the swap loses and the caller re-reads.
//!
//! That one primitive is what makes the claim state machine correct across
//! any number of server processes.

use sled::{IVec, Tree};

use crate::error::{CoreError, CoreResult};
use crate::link::request::LinkRequest;
use crate::storage::db::VaultLinkDb;

/// A link request together with the raw bytes it was read from.
///
/// The bytes are the CAS witness: [`LinkRequestStore::swap`] only succeeds
/// if the stored value is still byte-identical to what this read observed.
#[derive(Clone, Debug)]
pub struct StoredRequest {
    /// The decoded record.
    pub record: LinkRequest,
    /// The exact serialized form read from sled.
    raw: IVec,
}

/// Persisted store of wallet-link requests.
#[derive(Clone, Debug)]
pub struct LinkRequestStore {
    tree: Tree,
}

impl LinkRequestStore {
    /// Builds a store over the database's `link_requests` tree.
    pub fn new(db: &VaultLinkDb) -> Self {
        Self {
            tree: db.link_requests().clone(),
        }
    }

    /// Persists a brand-new `Pending` request.
    ///
    /// Uses insert-if-absent so a request id can never be silently
    /// overwritten. Ids are uuid v4, so a conflict here means a bug (or a
    /// caller reusing ids), not a race worth retrying.
    pub fn insert_new(&self, request: &LinkRequest) -> CoreResult<()> {
        let bytes = bincode::serialize(request)?;
        self.tree
            .compare_and_swap(request.request_id.as_bytes(), None::<&[u8]>, Some(bytes))?
            .map_err(|_| {
                CoreError::Internal(format!(
                    "request id collision: {}",
                    request.request_id
                ))
            })?;
        Ok(())
    }

    /// Loads a request along with its CAS witness bytes.
    pub fn load(&self, request_id: &str) -> CoreResult<Option<StoredRequest>> {
        match self.tree.get(request_id.as_bytes())? {
            Some(raw) => {
                let record: LinkRequest = bincode::deserialize(&raw)?;
                Ok(Some(StoredRequest { record, raw }))
            }
            None => Ok(None),
        }
    }

    /// Atomically replaces `prior` with `next`.
    ///
    /// Returns `Ok(true)` if this call won the swap, `Ok(false)` if some
    /// other writer changed the record since `prior` was read. The caller
    /// decides whether losing means "re-read and continue" (the resolver)
    /// or "give up".
    pub fn swap(&self, prior: &StoredRequest, next: &LinkRequest) -> CoreResult<bool> {
        let next_bytes = bincode::serialize(next)?;
        let outcome = self.tree.compare_and_swap(
            prior.record.request_id.as_bytes(),
            Some(&prior.raw),
            Some(next_bytes),
        )?;
        Ok(outcome.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::request::LinkStatus;

    fn store() -> LinkRequestStore {
        let db = VaultLinkDb::open_temporary().expect("temp db");
        LinkRequestStore::new(&db)
    }

    fn test_request() -> LinkRequest {
        LinkRequest::new("acct_1", "1", "0xtoken", "0xdeposit", 900)
    }

    #[test]
    fn insert_and_load_roundtrip() {
        let store = store();
        let req = test_request();
        store.insert_new(&req).expect("insert");

        let stored = store
            .load(&req.request_id)
            .expect("load")
            .expect("present");
        assert_eq!(stored.record.request_id, req.request_id);
        assert_eq!(stored.record.status, LinkStatus::Pending);
    }

    #[test]
    fn load_missing_returns_none() {
        let store = store();
        assert!(store.load("nope").expect("load").is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = store();
        let req = test_request();
        store.insert_new(&req).expect("first insert");
        let result = store.insert_new(&req);
        assert!(matches!(result, Err(CoreError::Internal(_))));
    }

    #[test]
    fn swap_wins_against_fresh_read() {
        let store = store();
        let req = test_request();
        store.insert_new(&req).expect("insert");

        let stored = store.load(&req.request_id).unwrap().unwrap();
        let mut next = stored.record.clone();
        next.status = LinkStatus::Expired;

        assert!(store.swap(&stored, &next).expect("swap"));
        let after = store.load(&req.request_id).unwrap().unwrap();
        assert_eq!(after.record.status, LinkStatus::Expired);
    }

    #[test]
    fn swap_loses_against_stale_read() {
        let store = store();
        let req = test_request();
        store.insert_new(&req).expect("insert");

        // Two readers observe the same Pending record.
        let first = store.load(&req.request_id).unwrap().unwrap();
        let second = store.load(&req.request_id).unwrap().unwrap();

        let mut next_a = first.record.clone();
        next_a.status = LinkStatus::Completed;
        assert!(store.swap(&first, &next_a).expect("swap a"));

        // The second reader's witness is now stale.
        let mut next_b = second.record.clone();
        next_b.status = LinkStatus::Expired;
        assert!(!store.swap(&second, &next_b).expect("swap b"));

        let after = store.load(&req.request_id).unwrap().unwrap();
        assert_eq!(after.record.status, LinkStatus::Completed);
    }

    #[test]
    fn concurrent_swaps_have_exactly_one_winner() {
        let store = store();
        let req = test_request();
        store.insert_new(&req).expect("insert");

        let stored = store.load(&req.request_id).unwrap().unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let stored = stored.clone();
            handles.push(std::thread::spawn(move || {
                let mut next = stored.record.clone();
                next.status = LinkStatus::Completed;
                store.swap(&stored, &next).expect("swap")
            }));
        }

        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
