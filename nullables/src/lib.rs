//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies of the ledger (clock, storage, value custody) are
//! abstracted behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including injected failures
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod custody;
pub mod store;

pub use clock::NullClock;
pub use custody::NullCustody;
pub use store::NullStore;
