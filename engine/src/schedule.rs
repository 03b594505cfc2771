//! Pure period accounting over one account record.
//!
//! Nothing here touches the store or the clock: every function takes the record
//! and the instant it is evaluated at.

use serde::{Deserialize, Serialize};
use subledger_store::AccountRecord;
use subledger_types::{Amount, LedgerConfig, Timestamp};

/// Derived standing of an account. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription was ever created.
    Uninitialized,
    /// Purchased periods still cover the evaluated instant.
    Active,
    /// Purchased periods ran out; a fresh subscription may replace the record.
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

/// Period length and price: everything the accounting needs from the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BillingSchedule {
    period_secs: u64,
    period_cost: Amount,
}

impl BillingSchedule {
    pub fn new(period_secs: u64, period_cost: Amount) -> Self {
        Self {
            period_secs,
            period_cost,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.period_secs(), config.period_cost)
    }

    pub fn period_secs(&self) -> u64 {
        self.period_secs
    }

    pub fn period_cost(&self) -> Amount {
        self.period_cost
    }

    /// Whole periods the current stake pays for: `⌊staked / cost⌋`.
    pub fn periods_purchased(&self, record: &AccountRecord) -> u128 {
        record.staked_amount.whole_units_of(self.period_cost)
    }

    /// Length of the purchased activity window in seconds, saturating at `u64::MAX`.
    fn active_span_secs(&self, record: &AccountRecord) -> u64 {
        let span = self
            .periods_purchased(record)
            .saturating_mul(self.period_secs as u128);
        u64::try_from(span).unwrap_or(u64::MAX)
    }

    /// End of the half-open activity window `[deposit, deposit + purchased × period)`.
    ///
    /// `None` for a record that never subscribed. Saturates at `u64::MAX` seconds.
    pub fn active_until(&self, record: &AccountRecord) -> Option<Timestamp> {
        if !record.is_initialized() {
            return None;
        }
        Some(
            record
                .deposit_timestamp
                .saturating_add_secs(self.active_span_secs(record)),
        )
    }

    /// Whether the purchased periods cover `now`. False exactly at the window's end.
    pub fn is_active(&self, record: &AccountRecord, now: Timestamp) -> bool {
        record.is_initialized()
            && !record
                .deposit_timestamp
                .has_expired(self.active_span_secs(record), now)
    }

    /// Fully elapsed periods since the deposit: `⌊(now − deposit) / period⌋`.
    ///
    /// A clock reading before the deposit counts as zero elapsed periods.
    pub fn periods_elapsed(&self, record: &AccountRecord, now: Timestamp) -> u64 {
        record
            .deposit_timestamp
            .elapsed_since(now)
            .checked_div(self.period_secs)
            .unwrap_or(0)
    }

    /// Stake locked against the current period and every elapsed one.
    ///
    /// The lock persists after expiry: nothing ever releases an elapsed period.
    pub fn reserved_amount(&self, record: &AccountRecord, now: Timestamp) -> Amount {
        if !record.is_initialized() {
            return Amount::ZERO;
        }
        let periods = (self.periods_elapsed(record, now) as u128).saturating_add(1);
        self.period_cost.saturating_mul(periods)
    }

    /// Withdrawable surplus: `max(0, staked − reserved)`.
    pub fn available_balance(&self, record: &AccountRecord, now: Timestamp) -> Amount {
        if !record.is_initialized() {
            return Amount::ZERO;
        }
        record
            .staked_amount
            .saturating_sub(self.reserved_amount(record, now))
    }

    /// Stake that is spent or committed, i.e. not withdrawable at `now`.
    pub fn consumed_amount(&self, record: &AccountRecord, now: Timestamp) -> Amount {
        record
            .staked_amount
            .saturating_sub(self.available_balance(record, now))
    }

    pub fn status(&self, record: &AccountRecord, now: Timestamp) -> SubscriptionStatus {
        if !record.is_initialized() {
            SubscriptionStatus::Uninitialized
        } else if self.is_active(record, now) {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Expired
        }
    }
}
