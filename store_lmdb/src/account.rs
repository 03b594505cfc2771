//! LMDB implementation of [`SubscriptionStore`].
//!
//! The store shares its environment with the settlement journal, so a record change
//! and the transfer that pays for it commit in one write transaction.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use subledger_store::{
    AccountRecord, CommitError, Custody, StoreError, SubscriptionStore, Transfer,
};
use subledger_types::{AccountId, LedgerConfig};

use crate::journal::append_in;
use crate::LmdbError;

const CONFIG_KEY: &[u8] = b"ledger_config";

pub struct LmdbSubscriptionStore {
    env: Arc<Env>,
    accounts_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
    transfers_db: Database<Bytes, Bytes>,
}

impl LmdbSubscriptionStore {
    pub fn new(
        env: Arc<Env>,
        accounts_db: Database<Bytes, Bytes>,
        meta_db: Database<Bytes, Bytes>,
        transfers_db: Database<Bytes, Bytes>,
    ) -> Self {
        Self {
            env,
            accounts_db,
            meta_db,
            transfers_db,
        }
    }

    /// Number of accounts that ever held a record.
    pub fn account_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.accounts_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

impl SubscriptionStore for LmdbSubscriptionStore {
    fn get_account(&self, account: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .accounts_db
            .get(&rtxn, account.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => {
                let record: AccountRecord = bincode::deserialize(bytes).map_err(|e| {
                    StoreError::Corruption(format!("account record for {account}: {e}"))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_account(&self, account: &AccountId, record: &AccountRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.accounts_db
            .put(&mut wtxn, account.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    /// Journals `transfer` in the environment's settlement journal, in the same write
    /// transaction as the record. The journal is this store's custody, so `custody` is
    /// not called.
    fn commit_with_transfer(
        &self,
        account: &AccountId,
        record: &AccountRecord,
        transfer: &Transfer,
        _custody: &dyn Custody,
    ) -> Result<(), CommitError> {
        let commit = || -> Result<u64, StoreError> {
            let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
            let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
            self.accounts_db
                .put(&mut wtxn, account.as_bytes(), &bytes)
                .map_err(LmdbError::from)?;
            let journaled = append_in(
                &mut wtxn,
                self.transfers_db,
                transfer.direction,
                &transfer.account,
                transfer.amount,
                transfer.at,
            )?;
            wtxn.commit().map_err(LmdbError::from)?;
            Ok(journaled.seq)
        };
        let seq = commit().map_err(CommitError::Store)?;
        tracing::debug!(
            seq,
            direction = ?transfer.direction,
            %account,
            amount = %transfer.amount,
            "committed record with journaled transfer"
        );
        Ok(())
    }

    fn get_config(&self) -> Result<Option<LedgerConfig>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self.meta_db.get(&rtxn, CONFIG_KEY).map_err(LmdbError::from)? {
            Some(bytes) => {
                let config: LedgerConfig = bincode::deserialize(bytes)
                    .map_err(|e| StoreError::Corruption(format!("ledger config: {e}")))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    fn put_config(&self, config: &LedgerConfig) -> Result<(), StoreError> {
        let bytes = bincode::serialize(config).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, CONFIG_KEY, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use subledger_store::{TransferDirection, TransferError};
    use subledger_types::{Amount, SubscriptionPeriod, Timestamp};

    #[derive(Default)]
    struct CountingCustody {
        calls: AtomicUsize,
    }

    impl Custody for CountingCustody {
        fn receive(&self, _: &AccountId, _: Amount, _: Timestamp) -> Result<(), TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn pay(&self, _: &AccountId, _: Amount, _: Timestamp) -> Result<(), TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn open() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
        (dir, env)
    }

    #[test]
    fn unknown_account_reads_as_none() {
        let (_dir, env) = open();
        let store = env.subscription_store();
        let account = AccountId::new("nobody");
        assert!(store.get_account(&account).unwrap().is_none());
        assert_eq!(
            store.account_or_default(&account).unwrap(),
            AccountRecord::default()
        );
    }

    #[test]
    fn put_then_get_account() {
        let (_dir, env) = open();
        let store = env.subscription_store();
        let account = AccountId::new("alice");
        let record = AccountRecord::new(Amount::new(2_500), Timestamp::new(1_700_000_000));
        store.put_account(&account, &record).unwrap();
        assert_eq!(store.get_account(&account).unwrap(), Some(record));
        assert_eq!(store.account_count().unwrap(), 1);
    }

    #[test]
    fn overwrite_replaces_record() {
        let (_dir, env) = open();
        let store = env.subscription_store();
        let account = AccountId::new("alice");
        store
            .put_account(&account, &AccountRecord::new(Amount::new(1), Timestamp::new(10)))
            .unwrap();
        let fresh = AccountRecord::new(Amount::new(7), Timestamp::new(20));
        store.put_account(&account, &fresh).unwrap();
        assert_eq!(store.get_account(&account).unwrap(), Some(fresh));
        assert_eq!(store.account_count().unwrap(), 1);
    }

    #[test]
    fn config_absent_until_written() {
        let (_dir, env) = open();
        let store = env.subscription_store();
        assert!(store.get_config().unwrap().is_none());

        let config = LedgerConfig {
            period: SubscriptionPeriod::Biweekly,
            period_cost: Amount::new(1_000_000_000),
            owner: AccountId::new("owner"),
        };
        store.put_config(&config).unwrap();
        assert_eq!(store.get_config().unwrap(), Some(config));
    }

    #[test]
    fn corrupt_record_is_reported() {
        let (_dir, env) = open();
        let account = AccountId::new("mangled");
        {
            let mut wtxn = env.env().write_txn().unwrap();
            env.accounts_db
                .put(&mut wtxn, account.as_bytes(), &[1u8, 2, 3])
                .unwrap();
            wtxn.commit().unwrap();
        }
        let store = env.subscription_store();
        assert!(matches!(
            store.get_account(&account),
            Err(StoreError::Corruption(_))
        ));
    }

    #[test]
    fn commit_with_transfer_writes_record_and_journal_together() {
        let (_dir, env) = open();
        let store = env.subscription_store();
        let journal = env.transfer_journal();
        let custody = CountingCustody::default();
        let account = AccountId::new("alice");
        let record = AccountRecord::new(Amount::new(3_000), Timestamp::new(100));

        store
            .commit_with_transfer(
                &account,
                &record,
                &Transfer::incoming(&account, Amount::new(3_000), Timestamp::new(100)),
                &custody,
            )
            .unwrap();

        assert_eq!(store.get_account(&account).unwrap(), Some(record));
        let journaled = journal.transfers_after(0, 10).unwrap();
        assert_eq!(journaled.len(), 1);
        assert_eq!(journaled[0].direction, TransferDirection::In);
        assert_eq!(journaled[0].amount, Amount::new(3_000));
        assert_eq!(custody.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn journal_sequence_continues_across_commit_paths() {
        let (_dir, env) = open();
        let store = env.subscription_store();
        let journal = env.transfer_journal();
        let account = AccountId::new("bob");
        journal
            .append(TransferDirection::In, &account, Amount::new(1), Timestamp::new(1))
            .unwrap();
        store
            .commit_with_transfer(
                &account,
                &AccountRecord::new(Amount::ZERO, Timestamp::new(1)),
                &Transfer::outgoing(&account, Amount::new(1), Timestamp::new(2)),
                &CountingCustody::default(),
            )
            .unwrap();
        let seqs: Vec<u64> = journal
            .transfers_after(0, 10)
            .unwrap()
            .iter()
            .map(|t| t.seq)
            .collect();
        assert_eq!(seqs, vec![1, 2]);
    }
}
