//! Per-key write serialization.
//!
//! Every write that validates against the log (read stock, check, append) runs
//! while holding the mutex for its `StockKey`. Different keys never share a
//! mutex, so unrelated products and warehouses proceed independently.
//!
//! `SourceGate` orders movement commits against source deletion. A commit
//! holds it shared from resolving its source until the record is appended;
//! deletion holds it exclusively while counting references. Lock order is
//! gate, then key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockledger_core::{LedgerError, LedgerResult};
use stockledger_movements::StockKey;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    // Entries are never evicted: one small mutex per key ever written.
    locks: Mutex<HashMap<StockKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as the single writer for `key`.
    ///
    /// The table lock is only held long enough to fetch the key's mutex.
    pub fn with_key<T>(
        &self,
        key: StockKey,
        f: impl FnOnce() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let lock = {
            let mut table = self
                .locks
                .lock()
                .map_err(|_| LedgerError::storage("lock table poisoned"))?;
            table.entry(key).or_default().clone()
        };

        let _guard = lock
            .lock()
            .map_err(|_| LedgerError::storage(format!("write lock for {key} poisoned")))?;
        f()
    }

    /// Number of keys that have seen a write.
    pub fn key_count(&self) -> usize {
        self.locks.lock().map(|t| t.len()).unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct SourceGate {
    lock: RwLock<()>,
}

impl SourceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Held by movement commits. Any number may hold it at once.
    pub fn shared(&self) -> LedgerResult<RwLockReadGuard<'_, ()>> {
        self.lock
            .read()
            .map_err(|_| LedgerError::storage("source gate poisoned"))
    }

    /// Held by source deletion. Waits for in-flight commits to append.
    pub fn exclusive(&self) -> LedgerResult<RwLockWriteGuard<'_, ()>> {
        self.lock
            .write()
            .map_err(|_| LedgerError::storage("source gate poisoned"))
    }
}
