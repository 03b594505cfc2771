//! Currency amount type.
//!
//! Amounts are represented as integers (u128) in the smallest currency unit to avoid
//! floating-point errors. All ledger arithmetic is integer multiply/divide/add/sub.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A non-negative amount in the smallest currency unit.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_mul(self, factor: u128) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    /// Number of whole `unit`s contained in this amount. Zero when `unit` is zero.
    pub fn whole_units_of(self, unit: Amount) -> u128 {
        self.0.checked_div(unit.0).unwrap_or(0)
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl From<u128> for Amount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    /// Parse a decimal integer, allowing `_` digit separators (`1_000_000_000`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|c| *c != '_').collect();
        digits
            .parse::<u128>()
            .map(Self)
            .map_err(|_| TypesError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_separators() {
        assert_eq!("1_000_000_000".parse::<Amount>().unwrap(), Amount::new(1_000_000_000));
        assert_eq!(" 42 ".parse::<Amount>().unwrap(), Amount::new(42));
    }

    #[test]
    fn parse_rejects_negative_and_garbage() {
        assert!("-1".parse::<Amount>().is_err());
        assert!("ten".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
    }

    #[test]
    fn whole_units_floor_divides() {
        let cost = Amount::new(1_000);
        assert_eq!(Amount::new(2_500).whole_units_of(cost), 2);
        assert_eq!(Amount::new(999).whole_units_of(cost), 0);
        assert_eq!(Amount::new(5).whole_units_of(Amount::ZERO), 0);
    }

    #[test]
    fn checked_sub_refuses_underflow() {
        assert_eq!(Amount::new(1).checked_sub(Amount::new(2)), None);
        assert_eq!(Amount::new(1).saturating_sub(Amount::new(2)), Amount::ZERO);
    }
}
