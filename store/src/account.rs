//! Account storage trait.

use crate::{CommitError, Custody, StoreError, Transfer};
use subledger_types::{AccountId, Amount, LedgerConfig, Timestamp};
use serde::{Deserialize, Serialize};

/// Per-account subscription state.
///
/// There is no stored status: activity and expiry are derived from these two fields
/// and the clock on every query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Funds held on behalf of the account, net of all withdrawals.
    pub staked_amount: Amount,
    /// Start of the current billing cycle set. [`Timestamp::EPOCH`] means never subscribed.
    pub deposit_timestamp: Timestamp,
}

impl AccountRecord {
    pub fn new(staked_amount: Amount, deposit_timestamp: Timestamp) -> Self {
        Self {
            staked_amount,
            deposit_timestamp,
        }
    }

    /// Whether a subscription was ever created for this record.
    pub fn is_initialized(&self) -> bool {
        !self.deposit_timestamp.is_epoch()
    }
}

/// Trait for ledger storage: one record per account plus the global configuration.
///
/// A missing record reads as `Ok(None)`; callers treat it as [`AccountRecord::default`].
pub trait SubscriptionStore: Send + Sync {
    fn get_account(&self, account: &AccountId) -> Result<Option<AccountRecord>, StoreError>;
    fn put_account(&self, account: &AccountId, record: &AccountRecord) -> Result<(), StoreError>;

    fn get_config(&self) -> Result<Option<LedgerConfig>, StoreError>;

    /// Persist the global configuration. The engine calls this once, at construction.
    fn put_config(&self, config: &LedgerConfig) -> Result<(), StoreError>;

    /// Write `record` and move `transfer` as one unit of work.
    ///
    /// Moves value first and writes the record only after the transfer succeeded, so no
    /// reader sees a record that was never paid for. If the write then fails, the transfer
    /// is reversed. Backends that keep the settlement journal beside the records override
    /// this with a single transaction and journal `transfer` themselves instead of calling
    /// `custody`.
    fn commit_with_transfer(
        &self,
        account: &AccountId,
        record: &AccountRecord,
        transfer: &Transfer,
        custody: &dyn Custody,
    ) -> Result<(), CommitError> {
        transfer.execute(custody).map_err(CommitError::Transfer)?;
        if let Err(store) = self.put_account(account, record) {
            return match transfer.reversed().execute(custody) {
                Ok(()) => Err(CommitError::Store(store)),
                Err(reversal) => Err(CommitError::Unreconciled { store, reversal }),
            };
        }
        Ok(())
    }

    /// Read a record, substituting the uninitialised record for unknown accounts.
    fn account_or_default(&self, account: &AccountId) -> Result<AccountRecord, StoreError> {
        Ok(self.get_account(account)?.unwrap_or_default())
    }
}
