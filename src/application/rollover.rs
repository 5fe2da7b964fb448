//! Undistributed funds carried between pools.
//!
//! The balance lives in a singleton row that is created on first use. All
//! access goes through [`RolloverPool`]; nothing else touches the row.

use diesel::SqliteConnection;
use rust_decimal::Decimal;
use tracing::info;

use crate::adapter::outbound::sqlite::{ledger_store, unit::UnitOfWork};
use crate::domain::money::{checked_add, validate_amount, Amount};
use crate::domain::policy::LedgerPolicy;
use crate::error::Result;
use crate::port::outbound::notifier::Event;

#[derive(Debug, Clone, Copy)]
pub struct RolloverPool {
    policy: LedgerPolicy,
}

impl RolloverPool {
    #[must_use]
    pub const fn new(policy: LedgerPolicy) -> Self {
        Self { policy }
    }

    /// Add `amount` to the carried balance and return the new balance.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidAmount`](crate::domain::DomainError::InvalidAmount)
    /// for a non-positive or over-precise amount.
    pub fn add(&self, uow: &mut UnitOfWork<'_>, amount: Amount) -> Result<Amount> {
        let amount = validate_amount(amount, self.policy.minor_units)?;
        let current = ledger_store::load_rollover_balance(uow.conn())?.unwrap_or_default();
        let balance = checked_add(current, amount)?;
        ledger_store::store_rollover_balance(uow.conn(), balance)?;
        info!(%amount, %balance, "Rollover increased");
        uow.publish(Event::RolloverChanged { balance });
        Ok(balance)
    }

    /// Take up to `cap` (everything when `None`) out of the carried balance.
    ///
    /// Returns the amount actually consumed, which is `min(cap, available)`;
    /// an empty pool yields zero rather than an error.
    ///
    /// # Errors
    /// Returns a store error if the read or write fails.
    pub fn consume(&self, uow: &mut UnitOfWork<'_>, cap: Option<Amount>) -> Result<Amount> {
        let available = ledger_store::load_rollover_balance(uow.conn())?.unwrap_or_default();
        let consumed = match cap {
            Some(cap) => cap.max(Decimal::ZERO).min(available),
            None => available,
        };
        if consumed.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let balance = available - consumed;
        ledger_store::store_rollover_balance(uow.conn(), balance)?;
        info!(%consumed, %balance, "Rollover consumed");
        uow.publish(Event::RolloverChanged { balance });
        Ok(consumed)
    }

    /// Current carried balance; zero before first use.
    ///
    /// # Errors
    /// Returns a store error if the read fails.
    pub fn balance(&self, conn: &mut SqliteConnection) -> Result<Amount> {
        Ok(ledger_store::load_rollover_balance(conn)?.unwrap_or_default())
    }
}
