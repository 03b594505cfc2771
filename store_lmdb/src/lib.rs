//! LMDB storage backend for the subscription ledger.
//!
//! Implements the `subledger-store` traits using the `heed` LMDB bindings.
//! Each logical store maps to one LMDB database within a single environment:
//! `accounts` (records), `meta` (configuration, schema version) and `transfers`
//! (the settlement journal).

pub mod account;
pub mod environment;
pub mod error;
pub mod integrity;
pub mod journal;
pub mod meta;

pub use account::LmdbSubscriptionStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use journal::LmdbTransferJournal;
pub use meta::{LmdbMetaStore, CURRENT_SCHEMA_VERSION};
