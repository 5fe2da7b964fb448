//! Confirmed external deposits.
//!
//! Payment gateways hand the core a deposit that has already cleared. The
//! external reference is claimed under the `deposit` scope first, so a
//! redelivered webhook cannot credit twice.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::idempotency::{IdempotencyGuard, ReferenceScope};
use super::wallet::WalletLedger;
use crate::adapter::outbound::sqlite::unit::UnitOfWork;
use crate::domain::id::{Reference, UserId};
use crate::domain::money::Amount;
use crate::domain::policy::LedgerPolicy;
use crate::domain::wallet::{BalanceChange, TransactionKind, TransactionMeta};
use crate::error::Result;
use crate::port::outbound::notifier::Event;

/// A deposit the gateway has confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedDeposit {
    pub user_id: UserId,
    pub amount: Amount,
    pub external_reference: Reference,
}

#[derive(Debug, Clone, Copy)]
pub struct DepositIntake {
    wallet: WalletLedger,
    guard: IdempotencyGuard,
}

impl DepositIntake {
    #[must_use]
    pub const fn new(policy: LedgerPolicy) -> Self {
        Self {
            wallet: WalletLedger::new(policy),
            guard: IdempotencyGuard::new(),
        }
    }

    /// Credit a confirmed deposit, opening the wallet if needed.
    ///
    /// # Errors
    /// Returns [`DomainError::DuplicateReference`](crate::domain::DomainError::DuplicateReference)
    /// for a redelivered deposit and
    /// [`DomainError::InvalidAmount`](crate::domain::DomainError::InvalidAmount)
    /// for a bad amount.
    pub fn confirm_deposit(
        &self,
        uow: &mut UnitOfWork<'_>,
        deposit: &ConfirmedDeposit,
    ) -> Result<BalanceChange> {
        self.guard
            .ensure_unique(uow, &deposit.external_reference, ReferenceScope::Deposit)?;
        self.wallet.open(uow, &deposit.user_id)?;

        let meta = TransactionMeta::with_reference(deposit.external_reference.clone())
            .describe("Confirmed external deposit");
        let change = self.wallet.credit(
            uow,
            &deposit.user_id,
            deposit.amount,
            TransactionKind::Deposit,
            meta,
        )?;

        info!(
            user_id = %deposit.user_id,
            amount = %deposit.amount,
            reference = %deposit.external_reference,
            "Deposit confirmed"
        );
        uow.publish(Event::DepositConfirmed {
            user_id: deposit.user_id.clone(),
            amount: deposit.amount,
            reference: deposit.external_reference.clone(),
        });
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::testkit::db::TempDb;
    use crate::testkit::fixtures::balance;
    use crate::testkit::notifier::RecordingNotifier;
    use rust_decimal_macros::dec;

    fn deposit(reference: &str, amount: Amount) -> ConfirmedDeposit {
        ConfirmedDeposit {
            user_id: UserId::from("alice"),
            amount,
            external_reference: Reference::from(reference),
        }
    }

    #[test]
    fn deposit_opens_wallet_and_credits() {
        let recorder = RecordingNotifier::new();
        let temp = TempDb::create("deposit-credit");
        let db = temp.database_with(recorder.registry());
        let intake = DepositIntake::new(LedgerPolicy::default());

        let change = db
            .unit(|uow| intake.confirm_deposit(uow, &deposit("gw-1", dec!(250))))
            .unwrap();

        assert_eq!(change.balance_after, dec!(250));
        assert_eq!(change.reference.as_str(), "gw-1");
        assert_eq!(balance(&db, "alice"), dec!(250));
        assert!(recorder
            .events()
            .iter()
            .any(|e| matches!(e, Event::DepositConfirmed { .. })));
    }

    #[test]
    fn redelivered_deposit_is_rejected() {
        let temp = TempDb::create("deposit-redelivered");
        let db = temp.database();
        let intake = DepositIntake::new(LedgerPolicy::default());

        db.unit(|uow| intake.confirm_deposit(uow, &deposit("gw-1", dec!(250))))
            .unwrap();
        let err = db
            .unit(|uow| intake.confirm_deposit(uow, &deposit("gw-1", dec!(250))))
            .unwrap_err();

        assert!(matches!(
            err.as_domain(),
            Some(DomainError::DuplicateReference { scope, .. }) if scope == "deposit"
        ));
        assert_eq!(balance(&db, "alice"), dec!(250));
    }
}
