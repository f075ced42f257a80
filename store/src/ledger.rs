use crate::StoreError;
use tidal_types::HolderId;

/// Store trait for persisting ledger and bridge state to durable storage.
///
/// Values are opaque `Vec<u8>` so the store does not depend on the ledger or
/// bridge crates. Those crates serialize and deserialize their own types.
pub trait LedgerStore {
    fn get_account_state(&self, holder: &HolderId) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_account_state(&self, holder: &HolderId, state: &[u8]) -> Result<(), StoreError>;
    fn delete_account_state(&self, holder: &HolderId) -> Result<(), StoreError>;
    fn iter_account_states(&self) -> Result<Vec<(HolderId, Vec<u8>)>, StoreError>;

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
}
