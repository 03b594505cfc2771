//! Value custody: the collaborator that actually moves funds in and out.

use crate::TransferError;
use serde::{Deserialize, Serialize};
use subledger_types::{AccountId, Amount, Timestamp};

/// Moves value between an account and the ledger.
///
/// The engine reaches custody through [`crate::SubscriptionStore::commit_with_transfer`],
/// holding the account's lock. A record is only written once its transfer succeeded.
pub trait Custody: Send + Sync {
    /// Take `amount` from `from` into the ledger's custody.
    fn receive(&self, from: &AccountId, amount: Amount, at: Timestamp) -> Result<(), TransferError>;

    /// Release `amount` from the ledger's custody to `to`.
    fn pay(&self, to: &AccountId, amount: Amount, at: Timestamp) -> Result<(), TransferError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    /// Value entering custody (subscription deposit or increase).
    In,
    /// Value leaving custody (withdrawal or refund).
    Out,
}

/// One value movement, as recorded by journaling custody backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub seq: u64,
    pub direction: TransferDirection,
    pub account: AccountId,
    pub amount: Amount,
    pub at: Timestamp,
}

/// A value movement paired with a record change, before any journal assigns it a
/// sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub direction: TransferDirection,
    pub account: AccountId,
    pub amount: Amount,
    pub at: Timestamp,
}

impl Transfer {
    pub fn incoming(account: &AccountId, amount: Amount, at: Timestamp) -> Self {
        Self {
            direction: TransferDirection::In,
            account: account.clone(),
            amount,
            at,
        }
    }

    pub fn outgoing(account: &AccountId, amount: Amount, at: Timestamp) -> Self {
        Self {
            direction: TransferDirection::Out,
            account: account.clone(),
            amount,
            at,
        }
    }

    /// The movement that undoes this one.
    pub fn reversed(&self) -> Self {
        let direction = match self.direction {
            TransferDirection::In => TransferDirection::Out,
            TransferDirection::Out => TransferDirection::In,
        };
        Self {
            direction,
            ..self.clone()
        }
    }

    /// Carry out the movement through `custody`.
    pub fn execute(&self, custody: &dyn Custody) -> Result<(), TransferError> {
        match self.direction {
            TransferDirection::In => custody.receive(&self.account, self.amount, self.at),
            TransferDirection::Out => custody.pay(&self.account, self.amount, self.at),
        }
    }
}
