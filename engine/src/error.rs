//! Engine errors. Every variant except `Unreconciled` leaves the ledger and custody as
//! they were before the call.

use subledger_store::StoreError;
use subledger_types::Amount;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("account already holds an active subscription")]
    AlreadySubscribed,

    #[error("deposit of {provided} does not cover one period costing {needed}")]
    InsufficientDeposit { needed: Amount, provided: Amount },

    #[error("account has no active subscription")]
    NotSubscribed,

    #[error("increase of {provided} does not cover one period costing {needed}")]
    InsufficientIncrease { needed: Amount, provided: Amount },

    #[error("nothing to withdraw")]
    NothingToWithdraw,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("ledger is already initialized")]
    AlreadyInitialized,

    #[error("ledger has not been initialized")]
    NotInitialized,

    #[error("clock reading {0} cannot start a subscription")]
    InvalidTimestamp(u64),

    #[error("arithmetic overflow in stake computation")]
    Overflow,

    #[error("value transfer failed: {0}")]
    TransferFailed(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A record write failed after value moved and the movement could not be undone.
    #[error("ledger and custody disagree: {0}")]
    Unreconciled(String),
}

impl EngineError {
    /// Stable machine-readable name, used by outer surfaces.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadySubscribed => "already_subscribed",
            Self::InsufficientDeposit { .. } => "insufficient_deposit",
            Self::NotSubscribed => "not_subscribed",
            Self::InsufficientIncrease { .. } => "insufficient_increase",
            Self::NothingToWithdraw => "nothing_to_withdraw",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::AlreadyInitialized => "already_initialized",
            Self::NotInitialized => "not_initialized",
            Self::InvalidTimestamp(_) => "invalid_timestamp",
            Self::Overflow => "overflow",
            Self::TransferFailed(_) => "transfer_failed",
            Self::Store(_) => "store",
            Self::Unreconciled(_) => "unreconciled",
        }
    }
}
