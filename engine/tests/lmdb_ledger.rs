//! End-to-end: engine over the LMDB store with the settlement journal as custody.

use std::sync::Arc;

use subledger_engine::{EngineError, SubscriptionEngine};
use subledger_nullables::NullClock;
use subledger_store::TransferDirection;
use subledger_store_lmdb::LmdbEnvironment;
use subledger_types::{AccountId, Amount, Timestamp, SECS_PER_DAY};

const COST: u128 = 1_000_000_000;
const T0: u64 = 1_700_000_000;

fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 64 * 1024 * 1024).expect("open env");
    (dir, env)
}

#[test]
fn state_survives_reopen() {
    let (dir, env) = temp_env();
    let clock = Arc::new(NullClock::new(T0));
    let alice = AccountId::new("alice");

    {
        let engine = SubscriptionEngine::construct(
            Arc::new(env.subscription_store()),
            clock.clone(),
            Arc::new(env.transfer_journal()),
            AccountId::new("owner"),
            0,
            Amount::new(COST),
        )
        .unwrap();
        engine
            .create_subscription(&alice, Amount::new(2_500_000_000))
            .unwrap();
        assert_eq!(engine.withdraw_all(&alice).unwrap(), Amount::new(1_500_000_000));
    }
    drop(env);

    let env = LmdbEnvironment::open(dir.path(), 64 * 1024 * 1024).unwrap();
    let engine = SubscriptionEngine::open(
        Arc::new(env.subscription_store()),
        clock.clone(),
        Arc::new(env.transfer_journal()),
    )
    .unwrap();
    assert_eq!(engine.owner(), &AccountId::new("owner"));
    assert_eq!(engine.staked_amount(&alice).unwrap(), Amount::new(COST));
    assert_eq!(engine.deposit_timestamp(&alice).unwrap(), Timestamp::new(T0));
    assert!(engine.is_active(&alice).unwrap());

    clock.advance(7 * SECS_PER_DAY);
    assert!(!engine.is_active(&alice).unwrap());
}

#[test]
fn journal_mirrors_value_movements() {
    let (_dir, env) = temp_env();
    let clock = Arc::new(NullClock::new(T0));
    let engine = SubscriptionEngine::construct(
        Arc::new(env.subscription_store()),
        clock.clone(),
        Arc::new(env.transfer_journal()),
        AccountId::new("owner"),
        0,
        Amount::new(COST),
    )
    .unwrap();
    let bob = AccountId::new("bob");

    engine.create_subscription(&bob, Amount::new(3 * COST)).unwrap();
    clock.advance(6 * SECS_PER_DAY);
    assert_eq!(engine.withdraw_all(&bob).unwrap(), Amount::new(2 * COST));
    assert!(matches!(
        engine.withdraw_all(&bob),
        Err(EngineError::NothingToWithdraw)
    ));

    let journal = env.transfer_journal();
    let transfers = journal.transfers_after(0, 100).unwrap();
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[0].direction, TransferDirection::In);
    assert_eq!(transfers[0].amount, Amount::new(3 * COST));
    assert_eq!(transfers[1].direction, TransferDirection::Out);
    assert_eq!(transfers[1].amount, Amount::new(2 * COST));
    assert_eq!(transfers[1].at, Timestamp::new(T0 + 6 * SECS_PER_DAY));
}

#[test]
fn concurrent_mutations_on_one_account_serialize() {
    let (_dir, env) = temp_env();
    let engine = Arc::new(
        SubscriptionEngine::construct(
            Arc::new(env.subscription_store()),
            Arc::new(NullClock::new(T0)),
            Arc::new(env.transfer_journal()),
            AccountId::new("owner"),
            2,
            Amount::new(COST),
        )
        .unwrap(),
    );
    let carol = AccountId::new("carol");
    engine.create_subscription(&carol, Amount::new(COST)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let carol = carol.clone();
            std::thread::spawn(move || {
                engine
                    .increase_subscription(&carol, Amount::new(COST))
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(engine.staked_amount(&carol).unwrap(), Amount::new(9 * COST));
    assert_eq!(engine.withdraw_all(&carol).unwrap(), Amount::new(8 * COST));
}
