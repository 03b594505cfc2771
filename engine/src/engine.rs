//! Core subscription engine.

use std::sync::Arc;

use subledger_store::{AccountRecord, CommitError, Custody, SubscriptionStore, Transfer};
use subledger_types::{AccountId, Amount, Clock, LedgerConfig, SubscriptionPeriod, Timestamp};

use crate::error::EngineError;
use crate::event::{EventBus, SubscriptionEvent};
use crate::locks::AccountLocks;
use crate::schedule::{BillingSchedule, SubscriptionStatus};

/// Evaluates account standing and applies deposits and withdrawals.
///
/// Every operation comes in two forms: `op_at(.., now)` evaluates at an explicit
/// instant, `op(..)` reads the injected clock once and delegates. Mutations hold the
/// account's lock from the precondition check through the value transfer. A record
/// change and its transfer commit as one unit through
/// [`SubscriptionStore::commit_with_transfer`].
pub struct SubscriptionEngine {
    store: Arc<dyn SubscriptionStore>,
    clock: Arc<dyn Clock>,
    custody: Arc<dyn Custody>,
    config: LedgerConfig,
    schedule: BillingSchedule,
    events: EventBus,
    locks: AccountLocks,
}

impl SubscriptionEngine {
    /// Initialise a ledger in an empty store.
    ///
    /// Fails with `InvalidConfiguration` for a selector outside the period table or a
    /// zero period cost, and with `AlreadyInitialized` if the store holds a configuration.
    pub fn construct(
        store: Arc<dyn SubscriptionStore>,
        clock: Arc<dyn Clock>,
        custody: Arc<dyn Custody>,
        owner: AccountId,
        period_selector: u8,
        period_cost: Amount,
    ) -> Result<Self, EngineError> {
        let period = SubscriptionPeriod::from_selector(period_selector)
            .map_err(|e| EngineError::InvalidConfiguration(e.to_string()))?;
        if period_cost.is_zero() {
            return Err(EngineError::InvalidConfiguration(
                "period cost must be positive".to_string(),
            ));
        }
        if store.get_config()?.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }

        let config = LedgerConfig {
            period,
            period_cost,
            owner,
        };
        store.put_config(&config)?;
        tracing::info!(
            owner = %config.owner,
            period = %config.period,
            period_cost = %config.period_cost,
            "ledger constructed"
        );
        Ok(Self::with_config(store, clock, custody, config))
    }

    /// Attach to a store that was initialised earlier.
    pub fn open(
        store: Arc<dyn SubscriptionStore>,
        clock: Arc<dyn Clock>,
        custody: Arc<dyn Custody>,
    ) -> Result<Self, EngineError> {
        let config = store.get_config()?.ok_or(EngineError::NotInitialized)?;
        if config.period_cost.is_zero() {
            return Err(EngineError::InvalidConfiguration(
                "stored period cost is zero".to_string(),
            ));
        }
        tracing::debug!(period = %config.period, period_cost = %config.period_cost, "ledger opened");
        Ok(Self::with_config(store, clock, custody, config))
    }

    fn with_config(
        store: Arc<dyn SubscriptionStore>,
        clock: Arc<dyn Clock>,
        custody: Arc<dyn Custody>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            custody,
            schedule: BillingSchedule::from_config(&config),
            config,
            events: EventBus::new(),
            locks: AccountLocks::new(),
        }
    }

    /// Register an observer for committed mutations.
    pub fn subscribe_events(&mut self, listener: Box<dyn Fn(&SubscriptionEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    // ── Configuration ───────────────────────────────────────────────────

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn owner(&self) -> &AccountId {
        &self.config.owner
    }

    /// Period selector as chosen at construction (0 weekly, 1 biweekly, 2 monthly).
    pub fn period(&self) -> u8 {
        self.config.period.selector()
    }

    pub fn period_cost(&self) -> Amount {
        self.config.period_cost
    }

    pub fn schedule(&self) -> &BillingSchedule {
        &self.schedule
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Raw record; the uninitialised record for unknown accounts.
    pub fn account(&self, account: &AccountId) -> Result<AccountRecord, EngineError> {
        Ok(self.store.account_or_default(account)?)
    }

    pub fn staked_amount(&self, account: &AccountId) -> Result<Amount, EngineError> {
        Ok(self.account(account)?.staked_amount)
    }

    pub fn deposit_timestamp(&self, account: &AccountId) -> Result<Timestamp, EngineError> {
        Ok(self.account(account)?.deposit_timestamp)
    }

    pub fn is_active(&self, account: &AccountId) -> Result<bool, EngineError> {
        self.is_active_at(account, self.clock.now())
    }

    pub fn is_active_at(&self, account: &AccountId, now: Timestamp) -> Result<bool, EngineError> {
        Ok(self.schedule.is_active(&self.account(account)?, now))
    }

    pub fn available_balance(&self, account: &AccountId) -> Result<Amount, EngineError> {
        self.available_balance_at(account, self.clock.now())
    }

    pub fn available_balance_at(
        &self,
        account: &AccountId,
        now: Timestamp,
    ) -> Result<Amount, EngineError> {
        Ok(self.schedule.available_balance(&self.account(account)?, now))
    }

    pub fn consumed_amount(&self, account: &AccountId) -> Result<Amount, EngineError> {
        self.consumed_amount_at(account, self.clock.now())
    }

    pub fn consumed_amount_at(
        &self,
        account: &AccountId,
        now: Timestamp,
    ) -> Result<Amount, EngineError> {
        Ok(self.schedule.consumed_amount(&self.account(account)?, now))
    }

    pub fn status(&self, account: &AccountId) -> Result<SubscriptionStatus, EngineError> {
        self.status_at(account, self.clock.now())
    }

    pub fn status_at(
        &self,
        account: &AccountId,
        now: Timestamp,
    ) -> Result<SubscriptionStatus, EngineError> {
        Ok(self.schedule.status(&self.account(account)?, now))
    }

    /// End of the account's activity window, `None` if it never subscribed.
    pub fn expires_at(&self, account: &AccountId) -> Result<Option<Timestamp>, EngineError> {
        Ok(self.schedule.active_until(&self.account(account)?))
    }

    // ── Mutations ───────────────────────────────────────────────────────

    pub fn create_subscription(
        &self,
        account: &AccountId,
        value: Amount,
    ) -> Result<AccountRecord, EngineError> {
        self.create_subscription_at(account, value, self.clock.now())
    }

    /// Open a subscription funded with `value`, starting at `now`.
    ///
    /// Replaces an expired record outright. Any unspent remainder that record still
    /// held stays in custody and is announced with
    /// [`SubscriptionEvent::StaleBalanceForfeited`].
    pub fn create_subscription_at(
        &self,
        account: &AccountId,
        value: Amount,
        now: Timestamp,
    ) -> Result<AccountRecord, EngineError> {
        if now.is_epoch() {
            return Err(EngineError::InvalidTimestamp(now.as_secs()));
        }
        self.locks.with_account(account, || {
            let previous = self.account(account)?;
            if self.schedule.is_active(&previous, now) {
                tracing::debug!(%account, "create rejected: already subscribed");
                return Err(EngineError::AlreadySubscribed);
            }
            if value < self.config.period_cost {
                tracing::debug!(%account, %value, "create rejected: insufficient deposit");
                return Err(EngineError::InsufficientDeposit {
                    needed: self.config.period_cost,
                    provided: value,
                });
            }

            let next = AccountRecord::new(value, now);
            self.commit(account, &next, Transfer::incoming(account, value, now))?;

            tracing::info!(%account, amount = %value, timestamp = now.as_secs(), "subscribed");
            self.events.emit(&SubscriptionEvent::Subscribed {
                account: account.clone(),
                amount: value,
                timestamp: now,
            });
            let forfeited = self.unspent_remainder(&previous);
            if !forfeited.is_zero() {
                tracing::warn!(
                    %account,
                    %forfeited,
                    "re-subscription replaced an expired record holding unspent stake"
                );
                self.events.emit(&SubscriptionEvent::StaleBalanceForfeited {
                    account: account.clone(),
                    amount: forfeited,
                    timestamp: now,
                });
            }
            Ok(next)
        })
    }

    pub fn increase_subscription(
        &self,
        account: &AccountId,
        value: Amount,
    ) -> Result<AccountRecord, EngineError> {
        self.increase_subscription_at(account, value, self.clock.now())
    }

    /// Add `value` to an active subscription. The deposit timestamp is unchanged.
    pub fn increase_subscription_at(
        &self,
        account: &AccountId,
        value: Amount,
        now: Timestamp,
    ) -> Result<AccountRecord, EngineError> {
        self.locks.with_account(account, || {
            let previous = self.account(account)?;
            if !self.schedule.is_active(&previous, now) {
                tracing::debug!(%account, "increase rejected: not subscribed");
                return Err(EngineError::NotSubscribed);
            }
            if value < self.config.period_cost {
                tracing::debug!(%account, %value, "increase rejected: insufficient increase");
                return Err(EngineError::InsufficientIncrease {
                    needed: self.config.period_cost,
                    provided: value,
                });
            }
            let staked = previous
                .staked_amount
                .checked_add(value)
                .ok_or(EngineError::Overflow)?;

            let next = AccountRecord::new(staked, previous.deposit_timestamp);
            self.commit(account, &next, Transfer::incoming(account, value, now))?;

            tracing::info!(%account, amount = %value, staked = %staked, "subscription increased");
            self.events.emit(&SubscriptionEvent::SubscriptionIncreased {
                account: account.clone(),
                amount: value,
                timestamp: now,
            });
            Ok(next)
        })
    }

    pub fn withdraw_all(&self, account: &AccountId) -> Result<Amount, EngineError> {
        self.withdraw_all_at(account, self.clock.now())
    }

    /// Pay out the account's entire available balance. Returns the amount paid.
    ///
    /// Committed periods stay staked, so an active account remains active.
    pub fn withdraw_all_at(
        &self,
        account: &AccountId,
        now: Timestamp,
    ) -> Result<Amount, EngineError> {
        self.locks.with_account(account, || {
            let previous = self.account(account)?;
            let available = self.schedule.available_balance(&previous, now);
            if available.is_zero() {
                tracing::debug!(%account, "withdraw rejected: nothing to withdraw");
                return Err(EngineError::NothingToWithdraw);
            }
            let staked = previous
                .staked_amount
                .checked_sub(available)
                .ok_or(EngineError::Overflow)?;

            let next = AccountRecord::new(staked, previous.deposit_timestamp);
            self.commit(account, &next, Transfer::outgoing(account, available, now))?;

            tracing::info!(%account, amount = %available, staked = %staked, "withdrawal");
            self.events.emit(&SubscriptionEvent::Withdrawal {
                account: account.clone(),
                amount: available,
                timestamp: now,
            });
            Ok(available)
        })
    }

    /// Stake beyond the purchased whole periods: what an expired record still holds
    /// once every period it paid for has elapsed.
    fn unspent_remainder(&self, record: &AccountRecord) -> Amount {
        let spent = self
            .config
            .period_cost
            .saturating_mul(self.schedule.periods_purchased(record));
        record.staked_amount.saturating_sub(spent)
    }

    /// Write `next` together with `transfer`. Must run under the account's lock.
    fn commit(
        &self,
        account: &AccountId,
        next: &AccountRecord,
        transfer: Transfer,
    ) -> Result<(), EngineError> {
        self.store
            .commit_with_transfer(account, next, &transfer, self.custody.as_ref())
            .map_err(|e| match e {
                CommitError::Transfer(e) => {
                    tracing::warn!(
                        %account,
                        direction = ?transfer.direction,
                        error = %e,
                        "transfer failed, record unchanged"
                    );
                    EngineError::TransferFailed(e.to_string())
                }
                CommitError::Store(e) => {
                    tracing::warn!(
                        %account,
                        error = %e,
                        "record write failed, value left where it was"
                    );
                    EngineError::Store(e)
                }
                e @ CommitError::Unreconciled { .. } => {
                    tracing::error!(
                        %account,
                        direction = ?transfer.direction,
                        amount = %transfer.amount,
                        error = %e,
                        "custody and ledger disagree"
                    );
                    EngineError::Unreconciled(e.to_string())
                }
            })
    }
}
