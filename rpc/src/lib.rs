//! HTTP/JSON server for the subscription ledger.
//!
//! Provides endpoints for:
//! - Ledger configuration (owner, period, period cost)
//! - Account standing (stake, deposit time, activity, available and consumed amounts)
//! - Creating and increasing subscriptions
//! - Withdrawing the available balance
//!
//! Callers identify themselves with the `account` field; authentication happens
//! upstream.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcServer};
