use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use subledger_types::AccountId;

/// Idle lock entries are pruned once the table grows past this many accounts.
const PRUNE_THRESHOLD: usize = 4_096;

/// Per-account locks for serialising mutations.
/// Calls on different accounts run concurrently.
/// Calls on the same account are serialized.
#[derive(Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a specific account.
    pub fn get(&self, account: &AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.len() >= PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(account.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the account's lock.
    ///
    /// The guarded value is `()`, so a poisoned lock carries no broken state and
    /// is simply re-entered.
    pub fn with_account<R>(&self, account: &AccountId, f: impl FnOnce() -> R) -> R {
        let lock = self.get(account);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of accounts with a lock entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop lock entries nobody is holding.
    pub fn prune(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
