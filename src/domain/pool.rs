//! Pools, options, entries, and settlement records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::id::{EntryId, OptionId, PoolId, Reference, UserId};
use super::money::Amount;

text_enum! {
    /// Pool lifecycle.
    ///
    /// `Open -> Locked -> Closed -> {Settled | Rollover}` is monotonic;
    /// `Refunded` can follow any non-terminal state.
    pub enum PoolStatus {
        Open => "open",
        Locked => "locked",
        Closed => "closed",
        Settled => "settled",
        Rollover => "rollover",
        Refunded => "refunded",
    }
}

impl PoolStatus {
    /// Position in the forward lifecycle.
    const fn rank(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Locked => 1,
            Self::Closed => 2,
            Self::Settled | Self::Rollover | Self::Refunded => 3,
        }
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Rollover | Self::Refunded)
    }

    /// Settlement already happened (either way).
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Settled | Self::Rollover)
    }

    /// Whether the lifecycle allows moving to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Refunded => true,
            Self::Open => false,
            _ => next.rank() > self.rank(),
        }
    }
}

text_enum! {
    pub enum OptionStatus {
        Active => "active",
        Eliminated => "eliminated",
    }
}

text_enum! {
    pub enum EntryStatus {
        Active => "active",
        Won => "won",
        Lost => "lost",
        Refunded => "refunded",
    }
}

text_enum! {
    /// Why a payout row exists.
    pub enum PayoutKind {
        Winning => "winning",
        Refund => "refund",
    }
}

text_enum! {
    pub enum PayoutStatus {
        Completed => "completed",
        /// Share rounded to zero; nothing was credited.
        Skipped => "skipped",
    }
}

text_enum! {
    /// How a pool was settled.
    pub enum SettlementKind {
        Winners => "winners",
        Rollover => "rollover",
    }
}

/// A wagering round.
#[derive(Debug, Clone, Serialize)]
pub struct Pool {
    pub id: PoolId,
    pub title: String,
    pub status: PoolStatus,
    /// Sum of live entry stakes.
    pub total_stake: Amount,
    /// `total_stake` plus any rollover seed.
    pub total_pool_amount: Amount,
    pub rollover_seed: Amount,
    pub min_entry: Amount,
    /// Pool-level override of the configured company cut.
    pub company_cut_percent: Option<Decimal>,
    pub closing_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Pool {
    /// Entries are accepted right now.
    #[must_use]
    pub fn accepts_entries(&self, now: DateTime<Utc>) -> bool {
        self.status == PoolStatus::Open && now < self.closing_date
    }

    /// Effective company cut, falling back to the configured default.
    #[must_use]
    pub fn resolve_company_cut(&self, default_percent: Decimal) -> Decimal {
        self.company_cut_percent.unwrap_or(default_percent)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolOption {
    pub id: OptionId,
    pub pool_id: PoolId,
    pub label: String,
    pub total_stake: Amount,
    pub status: OptionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolEntry {
    pub id: EntryId,
    pub pool_id: PoolId,
    pub option_id: OptionId,
    pub user_id: UserId,
    pub amount: Amount,
    pub reference: Reference,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Settlement snapshot; written once per pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolLedger {
    pub pool_id: PoolId,
    pub outcome: SettlementKind,
    pub total_pool: Amount,
    pub company_cut_percent: Decimal,
    pub company_cut: Amount,
    pub payout_pool: Amount,
    pub winning_option_id: Option<OptionId>,
    pub total_winning_stake: Amount,
    pub total_winners: i32,
    pub total_payouts: Amount,
    pub rollover_amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl PoolLedger {
    /// Undistributed remainder left by per-winner rounding.
    #[must_use]
    pub fn rounding_residual(&self) -> Amount {
        match self.outcome {
            SettlementKind::Winners => self.payout_pool - self.total_payouts,
            SettlementKind::Rollover => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolPayout {
    pub id: i64,
    pub pool_id: PoolId,
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub kind: PayoutKind,
    pub amount: Amount,
    pub txn_ref: Reference,
    pub status: PayoutStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Admin request to create a pool.
#[derive(Debug, Clone)]
pub struct NewPool {
    pub title: String,
    pub min_entry: Amount,
    pub closing_date: DateTime<Utc>,
    pub company_cut_percent: Option<Decimal>,
    /// Seed the pool with whatever the rollover pool holds.
    pub include_rollover: bool,
    pub options: Vec<String>,
}

/// Per-option totals in a pool read view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSummary {
    pub option_id: OptionId,
    pub label: String,
    pub status: OptionStatus,
    pub total_stake: Amount,
    pub participants: i32,
}

/// Read view of a pool's totals and participant counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    pub pool_id: PoolId,
    pub title: String,
    pub status: PoolStatus,
    pub total_stake: Amount,
    pub total_pool_amount: Amount,
    pub participants: i32,
    pub options: Vec<OptionSummary>,
    pub closing_date: DateTime<Utc>,
    /// Open and before the closing date at the time of the read.
    pub accepting_entries: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_monotonic() {
        assert!(PoolStatus::Open.can_transition_to(PoolStatus::Locked));
        assert!(PoolStatus::Open.can_transition_to(PoolStatus::Settled));
        assert!(PoolStatus::Locked.can_transition_to(PoolStatus::Closed));
        assert!(PoolStatus::Closed.can_transition_to(PoolStatus::Rollover));
        assert!(!PoolStatus::Locked.can_transition_to(PoolStatus::Open));
        assert!(!PoolStatus::Closed.can_transition_to(PoolStatus::Locked));
    }

    #[test]
    fn refunded_reachable_from_any_non_terminal_state() {
        for status in [PoolStatus::Open, PoolStatus::Locked, PoolStatus::Closed] {
            assert!(status.can_transition_to(PoolStatus::Refunded), "{status}");
        }
        for status in [
            PoolStatus::Settled,
            PoolStatus::Rollover,
            PoolStatus::Refunded,
        ] {
            assert!(!status.can_transition_to(PoolStatus::Refunded), "{status}");
        }
    }

    #[test]
    fn terminal_states() {
        assert!(PoolStatus::Settled.is_settled());
        assert!(PoolStatus::Rollover.is_settled());
        assert!(!PoolStatus::Refunded.is_settled());
        assert!(PoolStatus::Refunded.is_terminal());
        assert!(!PoolStatus::Closed.is_terminal());
    }
}
