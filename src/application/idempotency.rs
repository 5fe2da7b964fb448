//! Reference deduplication.
//!
//! The check and the claim are one INSERT against the `(scope, reference)`
//! primary key, so two concurrent callers cannot both pass.

use diesel::SqliteConnection;
use tracing::debug;

use crate::adapter::outbound::sqlite::{is_unique_violation, ledger_store, unit::UnitOfWork};
use crate::domain::error::DomainError;
use crate::domain::id::Reference;
use crate::error::{Error, Result};

/// Namespace a reference is unique within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceScope {
    PoolEntry,
    Deposit,
    Reversal,
}

impl ReferenceScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PoolEntry => "pool_entry",
            Self::Deposit => "deposit",
            Self::Reversal => "reversal",
        }
    }
}

impl std::fmt::Display for ReferenceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejects operation references that were already consumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdempotencyGuard;

impl IdempotencyGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Claim `reference` within `scope` for the current unit.
    ///
    /// The claim is rolled back with the unit, so a failed operation can be
    /// retried with the same reference.
    ///
    /// # Errors
    /// Returns [`DomainError::DuplicateReference`] if the pair was already
    /// claimed.
    pub fn ensure_unique(
        &self,
        uow: &mut UnitOfWork<'_>,
        reference: &Reference,
        scope: ReferenceScope,
    ) -> Result<()> {
        match ledger_store::insert_reference(uow.conn(), scope.as_str(), reference.as_str()) {
            Ok(()) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                debug!(%reference, %scope, "Duplicate reference rejected");
                Err(DomainError::DuplicateReference {
                    reference: reference.to_string(),
                    scope: scope.to_string(),
                }
                .into())
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    /// Whether `reference` was already claimed within `scope`.
    ///
    /// # Errors
    /// Returns a store error if the lookup fails.
    pub fn is_used(
        &self,
        conn: &mut SqliteConnection,
        reference: &Reference,
        scope: ReferenceScope,
    ) -> Result<bool> {
        ledger_store::reference_exists(conn, scope.as_str(), reference.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::db::TempDb;

    #[test]
    fn second_claim_is_a_duplicate() {
        let temp = TempDb::create("guard-duplicate");
        let db = temp.database();
        let guard = IdempotencyGuard::new();
        let reference = Reference::from("ext-1");

        db.unit(|uow| guard.ensure_unique(uow, &reference, ReferenceScope::Deposit))
            .unwrap();
        let err = db
            .unit(|uow| guard.ensure_unique(uow, &reference, ReferenceScope::Deposit))
            .unwrap_err();

        assert!(matches!(
            err.as_domain(),
            Some(DomainError::DuplicateReference { scope, .. }) if scope == "deposit"
        ));
    }

    #[test]
    fn scopes_are_independent() {
        let temp = TempDb::create("guard-scopes");
        let db = temp.database();
        let guard = IdempotencyGuard::new();
        let reference = Reference::from("shared");

        db.unit(|uow| {
            guard.ensure_unique(uow, &reference, ReferenceScope::Deposit)?;
            guard.ensure_unique(uow, &reference, ReferenceScope::PoolEntry)
        })
        .unwrap();

        let used = db
            .read(|conn| guard.is_used(conn, &reference, ReferenceScope::Reversal))
            .unwrap();
        assert!(!used);
    }

    #[test]
    fn rolled_back_claim_can_be_retried() {
        let temp = TempDb::create("guard-rollback");
        let db = temp.database();
        let guard = IdempotencyGuard::new();
        let reference = Reference::from("retry-me");

        let failed: Result<()> = db.unit(|uow| {
            guard.ensure_unique(uow, &reference, ReferenceScope::PoolEntry)?;
            Err(Error::Database("disk full".into()))
        });
        assert!(failed.is_err());

        db.unit(|uow| guard.ensure_unique(uow, &reference, ReferenceScope::PoolEntry))
            .unwrap();
    }
}
