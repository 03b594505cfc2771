//! Fundamental types for the subscription ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! account identifiers, amounts, timestamps and the clock seam, billing periods and the
//! immutable ledger configuration.

pub mod account;
pub mod amount;
pub mod error;
pub mod params;
pub mod time;

pub use account::AccountId;
pub use amount::Amount;
pub use error::TypesError;
pub use params::{LedgerConfig, SubscriptionPeriod, SECS_PER_DAY};
pub use time::{Clock, SystemClock, Timestamp};
