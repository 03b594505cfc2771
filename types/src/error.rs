//! Errors raised while constructing or parsing fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("account identifier must not be empty")]
    EmptyAccountId,

    #[error("account identifier is {len} bytes, maximum is {max}")]
    AccountIdTooLong { len: usize, max: usize },

    #[error("unknown period selector {0}, expected 0 (weekly), 1 (biweekly) or 2 (monthly)")]
    UnknownPeriodSelector(u8),

    #[error("unknown period name '{0}'")]
    UnknownPeriodName(String),

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
}
