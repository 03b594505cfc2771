//! Abstract storage traits for the subscription ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these traits.
//! The rest of the codebase depends only on the traits. Value custody sits beside
//! the store as its own seam: the ledger records entitlement, a [`Custody`]
//! implementation moves the money.

pub mod account;
pub mod custody;
pub mod error;

pub use account::{AccountRecord, SubscriptionStore};
pub use custody::{Custody, Transfer, TransferDirection, TransferRecord};
pub use error::{CommitError, StoreError, TransferError};
