//! Notifications emitted after a mutation commits.

use serde::Serialize;
use subledger_types::{AccountId, Amount, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    /// A subscription was created (or an expired one replaced).
    Subscribed {
        account: AccountId,
        amount: Amount,
        timestamp: Timestamp,
    },
    /// An active subscription received more stake.
    SubscriptionIncreased {
        account: AccountId,
        amount: Amount,
        timestamp: Timestamp,
    },
    /// Uncommitted stake was paid back to the account.
    Withdrawal {
        account: AccountId,
        amount: Amount,
        timestamp: Timestamp,
    },
    /// A re-subscription replaced an expired record that still held stake.
    StaleBalanceForfeited {
        account: AccountId,
        amount: Amount,
        timestamp: Timestamp,
    },
}

impl SubscriptionEvent {
    pub fn account(&self) -> &AccountId {
        match self {
            Self::Subscribed { account, .. }
            | Self::SubscriptionIncreased { account, .. }
            | Self::Withdrawal { account, .. }
            | Self::StaleBalanceForfeited { account, .. } => account,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Self::Subscribed { amount, .. }
            | Self::SubscriptionIncreased { amount, .. }
            | Self::Withdrawal { amount, .. }
            | Self::StaleBalanceForfeited { amount, .. } => *amount,
        }
    }
}

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the calling thread while the account lock is
/// held; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&SubscriptionEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&SubscriptionEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &SubscriptionEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn every_listener_sees_every_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            bus.subscribe(Box::new(move |e| seen.lock().unwrap().push(e.clone())));
        }
        let event = SubscriptionEvent::Withdrawal {
            account: AccountId::new("alice"),
            amount: Amount::new(5),
            timestamp: Timestamp::new(10),
        };
        bus.emit(&event);
        assert_eq!(bus.listener_count(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![event.clone(), event]);
    }

    #[test]
    fn accessors_cover_all_variants() {
        let event = SubscriptionEvent::StaleBalanceForfeited {
            account: AccountId::new("bob"),
            amount: Amount::new(3),
            timestamp: Timestamp::new(1),
        };
        assert_eq!(event.account().as_str(), "bob");
        assert_eq!(event.amount(), Amount::new(3));
    }
}
