use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

/// Failure reported by a [`crate::Custody`] implementation.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("custody journal error: {0}")]
    Store(#[from] StoreError),
}

/// Failure of [`crate::SubscriptionStore::commit_with_transfer`].
#[derive(Debug, Error)]
pub enum CommitError {
    /// The transfer failed; neither the record nor custody changed.
    #[error(transparent)]
    Transfer(TransferError),

    /// The record could not be written; any value moved was moved back.
    #[error(transparent)]
    Store(StoreError),

    /// The record write failed after value moved, and moving it back failed too.
    #[error("record write failed ({store}) and the transfer could not be reversed ({reversal})")]
    Unreconciled {
        store: StoreError,
        reversal: TransferError,
    },
}
