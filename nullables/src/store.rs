//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tidal_store::{LedgerStore, StoreError};
use tidal_types::HolderId;

/// An in-memory ledger store for testing.
pub struct NullLedgerStore {
    accounts: Mutex<HashMap<HolderId, Vec<u8>>>,
    meta: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    fail_deletes: AtomicBool,
}

impl NullLedgerStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            meta: Mutex::new(HashMap::new()),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Make every `delete_account_state` fail with a backend error.
    pub fn set_failing_deletes(&self, failing: bool) {
        self.fail_deletes.store(failing, Ordering::SeqCst);
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().map(|a| a.len()).unwrap_or(0)
    }
}

impl Default for NullLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".into())
}

impl LedgerStore for NullLedgerStore {
    fn get_account_state(&self, holder: &HolderId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.accounts.lock().map_err(poisoned)?.get(holder).cloned())
    }

    fn put_account_state(&self, holder: &HolderId, state: &[u8]) -> Result<(), StoreError> {
        self.accounts
            .lock()
            .map_err(poisoned)?
            .insert(holder.clone(), state.to_vec());
        Ok(())
    }

    fn delete_account_state(&self, holder: &HolderId) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("delete refused".into()));
        }
        self.accounts.lock().map_err(poisoned)?.remove(holder);
        Ok(())
    }

    fn iter_account_states(&self) -> Result<Vec<(HolderId, Vec<u8>)>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .map_err(poisoned)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .map_err(poisoned)?
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_and_meta_roundtrip() {
        let store = NullLedgerStore::new();
        let alice = HolderId::new("tdl_alice");
        store.put_account_state(&alice, b"state").unwrap();
        store.put_meta(b"k", b"v").unwrap();
        assert_eq!(store.get_account_state(&alice).unwrap(), Some(b"state".to_vec()));
        assert_eq!(store.get_meta(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.iter_account_states().unwrap().len(), 1);
        store.delete_account_state(&alice).unwrap();
        assert_eq!(store.account_count(), 0);
        assert_eq!(store.get_meta(b"missing").unwrap(), None);
    }

    #[test]
    fn failing_deletes_keep_the_entry() {
        let store = NullLedgerStore::new();
        let alice = HolderId::new("tdl_alice");
        store.put_account_state(&alice, b"state").unwrap();
        store.set_failing_deletes(true);
        assert!(matches!(
            store.delete_account_state(&alice),
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.account_count(), 1);
    }
}
