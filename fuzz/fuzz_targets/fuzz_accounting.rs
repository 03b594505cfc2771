#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use subledger_engine::{BillingSchedule, SubscriptionStatus};
use subledger_store::AccountRecord;
use subledger_types::{Amount, SubscriptionPeriod, Timestamp};

#[derive(Debug, Arbitrary)]
struct Input {
    period_selector: u8,
    period_cost: u128,
    staked: u128,
    deposit: u64,
    now: u64,
}

// Balance and activity evaluation must never panic, and must keep
// `available + consumed == staked` for any record and instant.
fuzz_target!(|input: Input| {
    let period = match SubscriptionPeriod::from_selector(input.period_selector % 3) {
        Ok(period) => period,
        Err(_) => return,
    };
    if input.period_cost == 0 {
        return;
    }
    let schedule = BillingSchedule::new(period.duration_secs(), Amount::new(input.period_cost));
    let record = AccountRecord::new(Amount::new(input.staked), Timestamp::new(input.deposit));
    let now = Timestamp::new(input.now);

    let available = schedule.available_balance(&record, now);
    let consumed = schedule.consumed_amount(&record, now);
    assert!(available <= record.staked_amount);
    assert_eq!(available.checked_add(consumed), Some(record.staked_amount));

    let active = schedule.is_active(&record, now);
    if active {
        assert_eq!(schedule.status(&record, now), SubscriptionStatus::Active);
    }
    if let Some(until) = schedule.active_until(&record) {
        assert_eq!(active, record.is_initialized() && now < until);
    }
});
