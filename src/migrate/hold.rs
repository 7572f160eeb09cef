//! Reference-counted hold on a storage location.
//!
//! A migration must keep its storage location alive for its whole run: the
//! location may not be closed or torn down while a hold is outstanding.
//! Holds are RAII guards, released on every exit path including early
//! returns. They do not exclude concurrent read-only access.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DoruError, Result};
use crate::storage::Storage;

// Hold count and closed flag share one atomic word so acquiring a hold and
// closing the store are each a single compare-and-swap; neither can interleave
// with the other's check.
const CLOSED: u64 = 1 << 63;

/// A storage location with a reference count guarding its lifetime.
#[derive(Debug)]
pub struct IndexStore {
    storage: Arc<dyn Storage>,
    state: AtomicU64,
}

impl IndexStore {
    /// Wrap a storage backend in a store.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        IndexStore {
            storage,
            state: AtomicU64::new(0),
        }
    }

    /// Acquire a hold, preventing the store from being closed until the
    /// returned guard is dropped.
    pub fn hold(&self) -> Result<StoreHold<'_>> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & CLOSED != 0 {
                return Err(DoruError::unavailable("Store is closed"));
            }

            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(StoreHold { store: self }),
                Err(actual) => current = actual,
            }
        }
    }

    /// Close the store. Fails while holds are outstanding.
    pub fn try_close(&self) -> Result<()> {
        match self
            .state
            .compare_exchange(0, CLOSED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(actual) if actual & CLOSED != 0 => Ok(()),
            Err(actual) => Err(DoruError::unavailable(format!(
                "Store has {actual} active holds"
            ))),
        }
    }

    /// Number of outstanding holds.
    pub fn hold_count(&self) -> u64 {
        self.state.load(Ordering::Acquire) & !CLOSED
    }

    /// The underlying storage backend.
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }
}

/// RAII guard for one hold on an [`IndexStore`].
#[derive(Debug)]
pub struct StoreHold<'a> {
    store: &'a IndexStore,
}

impl StoreHold<'_> {
    /// The storage backend of the held store.
    pub fn storage(&self) -> &dyn Storage {
        self.store.storage()
    }
}

impl Drop for StoreHold<'_> {
    fn drop(&mut self) {
        self.store.state.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn test_store() -> IndexStore {
        IndexStore::new(Arc::new(MemoryStorage::new_default()))
    }

    #[test]
    fn test_hold_and_release() {
        let store = test_store();
        assert_eq!(store.hold_count(), 0);

        {
            let _hold = store.hold().unwrap();
            assert_eq!(store.hold_count(), 1);

            let _second = store.hold().unwrap();
            assert_eq!(store.hold_count(), 2);
        }

        assert_eq!(store.hold_count(), 0);
    }

    #[test]
    fn test_close_blocked_by_hold() {
        let store = test_store();

        let hold = store.hold().unwrap();
        match store.try_close() {
            Err(DoruError::StorageUnavailable(_)) => {}
            other => panic!("Expected storage unavailable error, got {other:?}"),
        }

        drop(hold);
        store.try_close().unwrap();
    }

    #[test]
    fn test_hold_fails_after_close() {
        let store = test_store();
        store.try_close().unwrap();

        match store.hold() {
            Err(DoruError::StorageUnavailable(_)) => {}
            other => panic!("Expected storage unavailable error, got {other:?}"),
        }
        assert_eq!(store.hold_count(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = test_store();
        store.try_close().unwrap();
        store.try_close().unwrap();
    }

    #[test]
    fn test_close_excludes_concurrent_holds() {
        use std::sync::atomic::AtomicBool;
        use std::thread;

        let store = Arc::new(test_store());
        let stop = Arc::new(AtomicBool::new(false));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        if let Ok(hold) = store.hold() {
                            // Closing must fail while this hold is live.
                            assert!(store.try_close().is_err());
                            drop(hold);
                        }
                    }
                })
            })
            .collect();

        for _ in 0..10_000 {
            if store.try_close().is_ok() {
                break;
            }
        }
        stop.store(true, Ordering::Relaxed);

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(store.hold_count(), 0);
    }
}
