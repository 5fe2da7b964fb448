//! Notifier port for post-commit events.
//!
//! Money-moving components never perform side effects inline. They queue
//! [`Event`]s on the unit of work; the events are dispatched to every
//! registered [`Notifier`] only after the unit commits. A failing notifier
//! is logged and skipped, it never undoes the committed operation.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::domain::id::{EntryId, OptionId, PoolId, Reference, UserId};
use crate::domain::job::JobKind;
use crate::domain::pool::{PoolStatus, SettlementKind};
use crate::domain::wallet::TransactionKind;
use crate::error::Result;

/// Events published after a unit of work commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A wallet balance moved.
    BalanceChanged(BalanceEvent),
    /// A confirmed external deposit was applied.
    DepositConfirmed {
        user_id: UserId,
        amount: Decimal,
        reference: Reference,
    },
    PoolCreated {
        pool_id: PoolId,
        title: String,
        rollover_seed: Decimal,
    },
    PoolStatusChanged {
        pool_id: PoolId,
        status: PoolStatus,
    },
    OptionAdded {
        pool_id: PoolId,
        option_id: OptionId,
        label: String,
    },
    PoolJoined(JoinEvent),
    PoolSettled(SettlementEvent),
    PoolRefunded {
        pool_id: PoolId,
        refunded_count: usize,
        total_refunded: Decimal,
    },
    RolloverChanged {
        balance: Decimal,
    },
    /// A job exhausted its attempts.
    JobFailed {
        pool_id: PoolId,
        kind: JobKind,
        attempts: i32,
        error: String,
    },
}

impl Event {
    /// Pool whose cached views this event invalidates.
    #[must_use]
    pub fn pool_id(&self) -> Option<PoolId> {
        match self {
            Event::PoolCreated { pool_id, .. }
            | Event::PoolStatusChanged { pool_id, .. }
            | Event::OptionAdded { pool_id, .. }
            | Event::PoolRefunded { pool_id, .. }
            | Event::JobFailed { pool_id, .. } => Some(*pool_id),
            Event::PoolJoined(e) => Some(e.pool_id),
            Event::PoolSettled(e) => Some(e.pool_id),
            Event::BalanceChanged(_)
            | Event::DepositConfirmed { .. }
            | Event::RolloverChanged { .. } => None,
        }
    }
}

/// Wallet movement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceEvent {
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub reference: Reference,
}

/// Pool entry event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinEvent {
    pub pool_id: PoolId,
    pub option_id: OptionId,
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub amount: Decimal,
}

/// Pool settlement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementEvent {
    pub pool_id: PoolId,
    pub outcome: SettlementKind,
    pub total_winners: i32,
    pub total_payouts: Decimal,
    pub rollover_amount: Decimal,
}

/// Trait for post-commit event handlers.
///
/// Implementations must be thread-safe and should return quickly; slow
/// delivery (email, push) belongs in a spawned task.
pub trait Notifier: Send + Sync {
    /// Handle one committed event.
    ///
    /// # Errors
    /// A returned error is logged by the registry and otherwise ignored.
    fn notify(&self, event: &Event) -> Result<()>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Deliver each event to every notifier, logging failures.
    pub fn dispatch(&self, events: &[Event]) {
        for event in events {
            for notifier in &self.notifiers {
                if let Err(e) = notifier.notify(event) {
                    warn!(
                        notifier = notifier.name(),
                        error = %e,
                        ?event,
                        "Post-commit notifier failed"
                    );
                }
            }
        }
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}
