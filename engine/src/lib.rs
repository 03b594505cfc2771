//! Subscription engine: the accounting core of the ledger.
//!
//! An account stakes funds; every whole `period_cost` in the stake buys one billing
//! period starting at the deposit timestamp. Nothing about an account's standing is
//! stored: activity, the withdrawable surplus and the consumed amount are all derived
//! from `(staked_amount, deposit_timestamp, now)` on every call.
//!
//! ```text
//! active    ⇔ now < deposit + ⌊staked / cost⌋ × period
//! available = max(0, staked − (⌊(now − deposit) / period⌋ + 1) × cost)
//! ```
//!
//! This crate handles:
//! - Pure accounting over a record and a clock reading ([`BillingSchedule`])
//! - Creating, increasing and withdrawing subscriptions ([`SubscriptionEngine`])
//! - Per-account serialisation of mutations ([`AccountLocks`])
//! - Notifications to observers ([`EventBus`])

pub mod engine;
pub mod error;
pub mod event;
pub mod locks;
pub mod schedule;

pub use engine::SubscriptionEngine;
pub use error::EngineError;
pub use event::{EventBus, SubscriptionEvent};
pub use locks::AccountLocks;
pub use schedule::{BillingSchedule, SubscriptionStatus};
