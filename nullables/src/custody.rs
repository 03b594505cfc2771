//! Nullable custody: record value movements without moving anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use subledger_store::{Custody, TransferDirection, TransferError, TransferRecord};
use subledger_types::{AccountId, Amount, Timestamp};

/// A test custody backend that records transfers instead of executing them.
///
/// Tracks the total value held in custody so tests can assert that failed calls
/// moved nothing.
pub struct NullCustody {
    transfers: Mutex<Vec<TransferRecord>>,
    fail_receive: AtomicBool,
    fail_pay: AtomicBool,
}

impl NullCustody {
    pub fn new() -> Self {
        Self {
            transfers: Mutex::new(Vec::new()),
            fail_receive: AtomicBool::new(false),
            fail_pay: AtomicBool::new(false),
        }
    }

    /// Reject every subsequent `receive`.
    pub fn fail_receive(&self, fail: bool) {
        self.fail_receive.store(fail, Ordering::SeqCst);
    }

    /// Reject every subsequent `pay`.
    pub fn fail_pay(&self, fail: bool) {
        self.fail_pay.store(fail, Ordering::SeqCst);
    }

    /// All recorded transfers, oldest first.
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.transfers.lock().unwrap().clone()
    }

    /// Net value in custody: everything received minus everything paid out.
    pub fn held(&self) -> Amount {
        self.transfers
            .lock()
            .unwrap()
            .iter()
            .fold(Amount::ZERO, |held, t| match t.direction {
                TransferDirection::In => held + t.amount,
                TransferDirection::Out => held.saturating_sub(t.amount),
            })
    }

    /// Total paid out to one account.
    pub fn paid_to(&self, account: &AccountId) -> Amount {
        self.transfers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.direction == TransferDirection::Out && &t.account == account)
            .fold(Amount::ZERO, |sum, t| sum + t.amount)
    }

    fn record(&self, direction: TransferDirection, account: &AccountId, amount: Amount, at: Timestamp) {
        let mut transfers = self.transfers.lock().unwrap();
        let seq = transfers.len() as u64 + 1;
        transfers.push(TransferRecord {
            seq,
            direction,
            account: account.clone(),
            amount,
            at,
        });
    }
}

impl Default for NullCustody {
    fn default() -> Self {
        Self::new()
    }
}

impl Custody for NullCustody {
    fn receive(&self, from: &AccountId, amount: Amount, at: Timestamp) -> Result<(), TransferError> {
        if self.fail_receive.load(Ordering::SeqCst) {
            return Err(TransferError::Rejected("injected receive failure".to_string()));
        }
        self.record(TransferDirection::In, from, amount, at);
        Ok(())
    }

    fn pay(&self, to: &AccountId, amount: Amount, at: Timestamp) -> Result<(), TransferError> {
        if self.fail_pay.load(Ordering::SeqCst) {
            return Err(TransferError::Rejected("injected pay failure".to_string()));
        }
        self.record(TransferDirection::Out, to, amount, at);
        Ok(())
    }
}
