//! Ledger parameters: the billing period table and the immutable configuration.

use crate::{AccountId, Amount, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SECS_PER_DAY: u64 = 86_400;

/// The sanctioned billing period lengths.
///
/// Deployments pick one by selector: `0` weekly, `1` biweekly, `2` monthly (thirty days).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPeriod {
    Weekly,
    Biweekly,
    Monthly,
}

impl SubscriptionPeriod {
    pub const ALL: [SubscriptionPeriod; 3] = [Self::Weekly, Self::Biweekly, Self::Monthly];

    /// Map a wire selector onto a period, rejecting anything outside the table.
    pub fn from_selector(selector: u8) -> Result<Self, TypesError> {
        match selector {
            0 => Ok(Self::Weekly),
            1 => Ok(Self::Biweekly),
            2 => Ok(Self::Monthly),
            other => Err(TypesError::UnknownPeriodSelector(other)),
        }
    }

    pub fn selector(&self) -> u8 {
        match self {
            Self::Weekly => 0,
            Self::Biweekly => 1,
            Self::Monthly => 2,
        }
    }

    pub fn days(&self) -> u64 {
        match self {
            Self::Weekly => 7,
            Self::Biweekly => 14,
            Self::Monthly => 30,
        }
    }

    pub fn duration_secs(&self) -> u64 {
        self.days() * SECS_PER_DAY
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for SubscriptionPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionPeriod {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" | "1w" | "7d" => Ok(Self::Weekly),
            "biweekly" | "2w" | "14d" => Ok(Self::Biweekly),
            "monthly" | "30d" => Ok(Self::Monthly),
            _ => Err(TypesError::UnknownPeriodName(s.to_string())),
        }
    }
}

/// Global ledger configuration, fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Billing period length.
    pub period: SubscriptionPeriod,
    /// Cost of one billing period.
    pub period_cost: Amount,
    /// Account that constructed the ledger. Recorded for provenance only.
    pub owner: AccountId,
}

impl LedgerConfig {
    pub fn period_secs(&self) -> u64 {
        self.period.duration_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_table_matches_durations() {
        assert_eq!(SubscriptionPeriod::from_selector(0).unwrap().duration_secs(), 604_800);
        assert_eq!(SubscriptionPeriod::from_selector(1).unwrap().duration_secs(), 1_209_600);
        assert_eq!(SubscriptionPeriod::from_selector(2).unwrap().duration_secs(), 2_592_000);
    }

    #[test]
    fn unknown_selector_is_rejected() {
        assert_eq!(
            SubscriptionPeriod::from_selector(3),
            Err(TypesError::UnknownPeriodSelector(3))
        );
    }

    #[test]
    fn selector_roundtrips_through_table() {
        for period in SubscriptionPeriod::ALL {
            assert_eq!(SubscriptionPeriod::from_selector(period.selector()).unwrap(), period);
        }
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("Weekly".parse::<SubscriptionPeriod>().unwrap(), SubscriptionPeriod::Weekly);
        assert_eq!("14d".parse::<SubscriptionPeriod>().unwrap(), SubscriptionPeriod::Biweekly);
        assert!("yearly".parse::<SubscriptionPeriod>().is_err());
    }
}
