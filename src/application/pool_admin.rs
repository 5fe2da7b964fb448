//! Pool creation and lifecycle administration.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use tracing::info;

use super::rollover::RolloverPool;
use crate::adapter::outbound::sqlite::database::model::{decimal_text, now_text, NewPoolRow};
use crate::adapter::outbound::sqlite::{pool_store, unit::UnitOfWork};
use crate::domain::error::DomainError;
use crate::domain::id::{OptionId, PoolId};
use crate::domain::money::validate_amount;
use crate::domain::policy::LedgerPolicy;
use crate::domain::pool::{
    NewPool, OptionSummary, Pool, PoolOption, PoolStatus, PoolSummary,
};
use crate::error::Result;
use crate::port::outbound::notifier::Event;

/// Admin operations on pools and their options.
#[derive(Debug, Clone, Copy)]
pub struct PoolAdmin {
    policy: LedgerPolicy,
    rollover: RolloverPool,
}

impl PoolAdmin {
    #[must_use]
    pub const fn new(policy: LedgerPolicy) -> Self {
        Self {
            policy,
            rollover: RolloverPool::new(policy),
        }
    }

    /// Create an open pool with its options.
    ///
    /// With `include_rollover`, the whole carried rollover balance is moved
    /// into the pool as its seed.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidPool`] for a blank title, fewer than two
    /// distinct options, or a cut outside `[0, 100]`, and
    /// [`DomainError::InvalidAmount`] for a bad minimum entry.
    pub fn create_pool(&self, uow: &mut UnitOfWork<'_>, new_pool: &NewPool) -> Result<Pool> {
        let title = new_pool.title.trim();
        if title.is_empty() {
            return Err(DomainError::InvalidPool("title must not be empty".into()).into());
        }
        let labels = distinct_labels(&new_pool.options)?;
        let min_entry = validate_amount(new_pool.min_entry, self.policy.minor_units)?;
        if let Some(pct) = new_pool.company_cut_percent {
            validate_cut(pct)?;
        }

        let seed = if new_pool.include_rollover {
            self.rollover.consume(uow, None)?
        } else {
            Decimal::ZERO
        };

        let now = now_text();
        let pool_id = pool_store::insert_pool(
            uow.conn(),
            &NewPoolRow {
                title: title.to_string(),
                status: PoolStatus::Open.as_str().to_string(),
                total_stake: "0".to_string(),
                total_pool_amount: decimal_text(seed),
                rollover_seed: decimal_text(seed),
                min_entry: decimal_text(min_entry),
                company_cut_percent: new_pool.company_cut_percent.map(decimal_text),
                closing_date: new_pool.closing_date.to_rfc3339(),
                created_at: now.clone(),
                updated_at: now,
            },
        )?;
        for label in &labels {
            pool_store::insert_option(uow.conn(), pool_id, label)?;
        }

        info!(%pool_id, title, options = labels.len(), rollover_seed = %seed, "Pool created");
        uow.publish(Event::PoolCreated {
            pool_id,
            title: title.to_string(),
            rollover_seed: seed,
        });
        pool_store::get_pool(uow.conn(), pool_id)
    }

    /// Add an option to a pool that is still open.
    ///
    /// # Errors
    /// Returns [`DomainError::PoolNotOpen`] once the pool left `open`, and
    /// [`DomainError::InvalidPool`] for a blank or duplicate label.
    pub fn add_option(
        &self,
        uow: &mut UnitOfWork<'_>,
        pool_id: PoolId,
        label: &str,
    ) -> Result<PoolOption> {
        let pool = pool_store::get_pool(uow.conn(), pool_id)?;
        if pool.status != PoolStatus::Open {
            return Err(DomainError::PoolNotOpen {
                pool_id: pool_id.get(),
                reason: format!("status is {}", pool.status),
            }
            .into());
        }
        let label = label.trim();
        if label.is_empty() {
            return Err(DomainError::InvalidPool("option label must not be empty".into()).into());
        }
        let lowered = label.to_lowercase();
        if pool_store::list_options(uow.conn(), pool_id)?
            .iter()
            .any(|o| o.label.to_lowercase() == lowered)
        {
            return Err(
                DomainError::InvalidPool(format!("duplicate option label '{label}'")).into(),
            );
        }
        let option_id = pool_store::insert_option(uow.conn(), pool_id, label)?;
        info!(%pool_id, %option_id, label, "Option added");
        uow.publish(Event::OptionAdded {
            pool_id,
            option_id,
            label: label.to_string(),
        });
        require_option(uow.conn(), pool_id, option_id)
    }

    /// Stop accepting entries: `open -> locked`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] from any other state.
    pub fn lock_pool(&self, uow: &mut UnitOfWork<'_>, pool_id: PoolId) -> Result<Pool> {
        self.transition(uow, pool_id, PoolStatus::Locked)
    }

    /// Close a pool ahead of settlement: `open | locked -> closed`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] from any other state.
    pub fn close_pool(&self, uow: &mut UnitOfWork<'_>, pool_id: PoolId) -> Result<Pool> {
        self.transition(uow, pool_id, PoolStatus::Closed)
    }

    /// Move a pool between its administrative states. Terminal states are
    /// reached only through settlement and refund, which write the matching
    /// snapshot and payouts.
    fn transition(&self, uow: &mut UnitOfWork<'_>, pool_id: PoolId, to: PoolStatus) -> Result<Pool> {
        let pool = pool_store::get_pool(uow.conn(), pool_id)?;
        if to.is_terminal() {
            return Err(DomainError::InvalidTransition {
                pool_id: pool_id.get(),
                from: pool.status,
                to,
            }
            .into());
        }
        transition_pool(uow, &pool, to)?;
        pool_store::get_pool(uow.conn(), pool_id)
    }

    /// Pool by id.
    ///
    /// # Errors
    /// Returns [`DomainError::PoolNotFound`] for an unknown id.
    pub fn pool(&self, conn: &mut SqliteConnection, pool_id: PoolId) -> Result<Pool> {
        pool_store::get_pool(conn, pool_id)
    }

    /// Totals and participant counts for a pool.
    ///
    /// # Errors
    /// Returns [`DomainError::PoolNotFound`] for an unknown id.
    pub fn summary(&self, conn: &mut SqliteConnection, pool_id: PoolId) -> Result<PoolSummary> {
        pool_summary(conn, pool_id)
    }
}

/// Apply a lifecycle move to a loaded pool and queue the status event.
pub(crate) fn transition_pool(uow: &mut UnitOfWork<'_>, pool: &Pool, to: PoolStatus) -> Result<()> {
    if !pool.status.can_transition_to(to) {
        return Err(DomainError::InvalidTransition {
            pool_id: pool.id.get(),
            from: pool.status,
            to,
        }
        .into());
    }
    pool_store::set_pool_status(uow.conn(), pool.id, to)?;
    info!(pool_id = %pool.id, from = %pool.status, %to, "Pool status changed");
    uow.publish(Event::PoolStatusChanged {
        pool_id: pool.id,
        status: to,
    });
    Ok(())
}

pub(crate) fn require_option(
    conn: &mut SqliteConnection,
    pool_id: PoolId,
    option_id: OptionId,
) -> Result<PoolOption> {
    pool_store::find_option(conn, pool_id, option_id)?.ok_or_else(|| {
        DomainError::OptionNotFound {
            pool_id: pool_id.get(),
            option_id: option_id.get(),
        }
        .into()
    })
}

pub(crate) fn pool_summary(conn: &mut SqliteConnection, pool_id: PoolId) -> Result<PoolSummary> {
    let pool = pool_store::get_pool(conn, pool_id)?;
    let counts: HashMap<i64, i32> = pool_store::participant_counts(conn, pool_id)?
        .into_iter()
        .map(|row| (row.option_id, row.participant_count))
        .collect();
    let options: Vec<OptionSummary> = pool_store::list_options(conn, pool_id)?
        .into_iter()
        .map(|option| OptionSummary {
            participants: counts.get(&option.id.get()).copied().unwrap_or(0),
            option_id: option.id,
            label: option.label,
            status: option.status,
            total_stake: option.total_stake,
        })
        .collect();

    let accepting_entries = pool.accepts_entries(Utc::now());
    Ok(PoolSummary {
        pool_id,
        title: pool.title,
        status: pool.status,
        total_stake: pool.total_stake,
        total_pool_amount: pool.total_pool_amount,
        participants: options.iter().map(|o| o.participants).sum(),
        options,
        closing_date: pool.closing_date,
        accepting_entries,
    })
}

fn distinct_labels(options: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut labels = Vec::with_capacity(options.len());
    for label in options.iter().map(|l| l.trim()) {
        if label.is_empty() {
            return Err(DomainError::InvalidPool("option label must not be empty".into()).into());
        }
        if !seen.insert(label.to_lowercase()) {
            return Err(DomainError::InvalidPool(format!("duplicate option label '{label}'")).into());
        }
        labels.push(label.to_string());
    }
    if labels.len() < 2 {
        return Err(DomainError::InvalidPool("a pool needs at least two options".into()).into());
    }
    Ok(labels)
}

fn validate_cut(pct: Decimal) -> Result<()> {
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(DomainError::InvalidPool(format!(
            "company cut {pct}% is outside 0..=100"
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::db::TempDb;
    use crate::testkit::fixtures::new_pool;
    use rust_decimal_macros::dec;

    fn admin() -> PoolAdmin {
        PoolAdmin::new(LedgerPolicy::default())
    }

    #[test]
    fn create_pool_inserts_options() {
        let temp = TempDb::create("admin-create");
        let db = temp.database();

        let pool = db.unit(|uow| admin().create_pool(uow, &new_pool(&["Home", "Away", "Draw"]))).unwrap();
        assert_eq!(pool.status, PoolStatus::Open);
        assert_eq!(pool.total_pool_amount, Decimal::ZERO);

        let summary = db.read(|conn| admin().summary(conn, pool.id)).unwrap();
        assert_eq!(summary.options.len(), 3);
        assert_eq!(summary.participants, 0);
        assert!(summary.accepting_entries);
    }

    #[test]
    fn create_pool_rejects_bad_definitions() {
        let temp = TempDb::create("admin-invalid");
        let db = temp.database();

        for options in [&["Only"][..], &["Same", "same"][..], &["A", " "][..]] {
            let err = db.unit(|uow| admin().create_pool(uow, &new_pool(options))).unwrap_err();
            assert!(matches!(err.as_domain(), Some(DomainError::InvalidPool(_))), "{options:?}");
        }

        let mut bad_cut = new_pool(&["A", "B"]);
        bad_cut.company_cut_percent = Some(dec!(101));
        let err = db.unit(|uow| admin().create_pool(uow, &bad_cut)).unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidPool(_))));
    }

    #[test]
    fn include_rollover_seeds_the_pool() {
        let temp = TempDb::create("admin-seed");
        let db = temp.database();
        let rollover = RolloverPool::new(LedgerPolicy::default());
        db.unit(|uow| rollover.add(uow, dec!(250))).unwrap();

        let mut definition = new_pool(&["A", "B"]);
        definition.include_rollover = true;
        let pool = db.unit(|uow| admin().create_pool(uow, &definition)).unwrap();

        assert_eq!(pool.rollover_seed, dec!(250));
        assert_eq!(pool.total_pool_amount, dec!(250));
        assert_eq!(pool.total_stake, Decimal::ZERO);
        assert_eq!(db.read(|conn| rollover.balance(conn)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let temp = TempDb::create("admin-lifecycle");
        let db = temp.database();
        let pool = db.unit(|uow| admin().create_pool(uow, &new_pool(&["A", "B"]))).unwrap();

        let locked = db.unit(|uow| admin().lock_pool(uow, pool.id)).unwrap();
        assert_eq!(locked.status, PoolStatus::Locked);

        let err = db.unit(|uow| admin().lock_pool(uow, pool.id)).unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(DomainError::InvalidTransition { from: PoolStatus::Locked, to: PoolStatus::Locked, .. })
        ));

        let closed = db.unit(|uow| admin().close_pool(uow, pool.id)).unwrap();
        assert_eq!(closed.status, PoolStatus::Closed);
    }

    #[test]
    fn terminal_states_are_not_reachable_by_transition() {
        let temp = TempDb::create("admin-terminal");
        let db = temp.database();
        let pool = db.unit(|uow| admin().create_pool(uow, &new_pool(&["A", "B"]))).unwrap();

        for to in [PoolStatus::Settled, PoolStatus::Rollover, PoolStatus::Refunded] {
            let err = db.unit(|uow| admin().transition(uow, pool.id, to)).unwrap_err();
            assert!(
                matches!(err.as_domain(), Some(DomainError::InvalidTransition { from: PoolStatus::Open, .. })),
                "{to}"
            );
        }
        assert_eq!(db.read(|conn| admin().pool(conn, pool.id)).unwrap().status, PoolStatus::Open);
    }

    #[test]
    fn options_can_only_be_added_while_open() {
        let temp = TempDb::create("admin-add-option");
        let db = temp.database();
        let pool = db.unit(|uow| admin().create_pool(uow, &new_pool(&["A", "B"]))).unwrap();

        let option = db.unit(|uow| admin().add_option(uow, pool.id, "C")).unwrap();
        assert_eq!(option.label, "C");

        for label in ["C", "a"] {
            let dup = db.unit(|uow| admin().add_option(uow, pool.id, label)).unwrap_err();
            assert!(matches!(dup.as_domain(), Some(DomainError::InvalidPool(_))), "{label}");
        }

        db.unit(|uow| admin().lock_pool(uow, pool.id)).unwrap();
        let err = db.unit(|uow| admin().add_option(uow, pool.id, "D")).unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::PoolNotOpen { .. })));
    }

    #[test]
    fn unknown_pool_is_not_found() {
        let temp = TempDb::create("admin-missing");
        let db = temp.database();

        let err = db.read(|conn| admin().pool(conn, PoolId::new(99))).unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::PoolNotFound { pool_id: 99 })));
    }
}
