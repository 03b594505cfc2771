//! Settlement journal: a [`Custody`] backend that records value movements.
//!
//! The ledger does not hold funds itself. Every deposit and payout is appended
//! here, keyed by a monotonically increasing sequence number, for an external
//! settlement process to execute and reconcile.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use subledger_store::{Custody, StoreError, TransferDirection, TransferError, TransferRecord};
use subledger_types::{AccountId, Amount, Timestamp};

use crate::LmdbError;

pub struct LmdbTransferJournal {
    env: Arc<Env>,
    transfers_db: Database<Bytes, Bytes>,
}

impl LmdbTransferJournal {
    pub fn new(env: Arc<Env>, transfers_db: Database<Bytes, Bytes>) -> Self {
        Self { env, transfers_db }
    }

    /// Append one transfer, assigning the next sequence number.
    pub fn append(
        &self,
        direction: TransferDirection,
        account: &AccountId,
        amount: Amount,
        at: Timestamp,
    ) -> Result<TransferRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let record = append_in(&mut wtxn, self.transfers_db, direction, account, amount, at)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(seq = record.seq, ?direction, %account, %amount, "journaled transfer");
        Ok(record)
    }

    /// Transfers with a sequence number greater than `after`, oldest first.
    pub fn transfers_after(
        &self,
        after: u64,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let start = after.saturating_add(1).to_be_bytes();
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Included(&start[..]), Bound::Unbounded);
        let range = self
            .transfers_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for item in range.take(limit) {
            let (_, value) = item.map_err(LmdbError::from)?;
            let record: TransferRecord = bincode::deserialize(value)
                .map_err(|e| StoreError::Corruption(format!("transfer record: {e}")))?;
            out.push(record);
        }
        Ok(out)
    }

    pub fn transfer_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.transfers_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

/// Append inside a caller's write transaction. Nothing is visible until it commits.
pub(crate) fn append_in(
    wtxn: &mut RwTxn<'_>,
    transfers_db: Database<Bytes, Bytes>,
    direction: TransferDirection,
    account: &AccountId,
    amount: Amount,
    at: Timestamp,
) -> Result<TransferRecord, StoreError> {
    let seq = match transfers_db.last(wtxn).map_err(LmdbError::from)? {
        Some((key, _)) => decode_seq(key)?
            .checked_add(1)
            .ok_or_else(|| StoreError::Corruption("transfer sequence exhausted".to_string()))?,
        None => 1,
    };
    let record = TransferRecord {
        seq,
        direction,
        account: account.clone(),
        amount,
        at,
    };
    let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
    transfers_db
        .put(wtxn, &seq.to_be_bytes(), &bytes)
        .map_err(LmdbError::from)?;
    Ok(record)
}

fn decode_seq(key: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = key
        .try_into()
        .map_err(|_| StoreError::Corruption("transfer key is not 8 bytes".to_string()))?;
    Ok(u64::from_be_bytes(arr))
}

impl Custody for LmdbTransferJournal {
    fn receive(&self, from: &AccountId, amount: Amount, at: Timestamp) -> Result<(), TransferError> {
        self.append(TransferDirection::In, from, amount, at)?;
        Ok(())
    }

    fn pay(&self, to: &AccountId, amount: Amount, at: Timestamp) -> Result<(), TransferError> {
        self.append(TransferDirection::Out, to, amount, at)?;
        Ok(())
    }
}
