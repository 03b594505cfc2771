//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use subledger_store::{AccountRecord, StoreError, SubscriptionStore};
use subledger_types::{AccountId, LedgerConfig};

/// An in-memory subscription store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullStore {
    accounts: Mutex<HashMap<AccountId, AccountRecord>>,
    config: Mutex<Option<LedgerConfig>>,
    fail_writes: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            config: Mutex::new(None),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `put_*` call fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored account records.
    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionStore for NullStore {
    fn get_account(&self, account: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.accounts.lock().unwrap().get(account).copied())
    }

    fn put_account(&self, account: &AccountId, record: &AccountRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.accounts
            .lock()
            .unwrap()
            .insert(account.clone(), *record);
        Ok(())
    }

    fn get_config(&self) -> Result<Option<LedgerConfig>, StoreError> {
        Ok(self.config.lock().unwrap().clone())
    }

    fn put_config(&self, config: &LedgerConfig) -> Result<(), StoreError> {
        self.check_writable()?;
        *self.config.lock().unwrap() = Some(config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subledger_types::{Amount, Timestamp};

    #[test]
    fn put_and_get_account() {
        let store = NullStore::new();
        let alice = AccountId::new("alice");
        let record = AccountRecord::new(Amount::new(10), Timestamp::new(5));
        store.put_account(&alice, &record).unwrap();
        assert_eq!(store.get_account(&alice).unwrap(), Some(record));
        assert_eq!(store.account_count(), 1);
    }

    #[test]
    fn injected_failure_leaves_state_untouched() {
        let store = NullStore::new();
        let alice = AccountId::new("alice");
        store.fail_writes(true);
        let record = AccountRecord::new(Amount::new(10), Timestamp::new(5));
        assert!(store.put_account(&alice, &record).is_err());
        assert!(store.get_account(&alice).unwrap().is_none());

        store.fail_writes(false);
        store.put_account(&alice, &record).unwrap();
        assert!(store.get_account(&alice).unwrap().is_some());
    }
}
