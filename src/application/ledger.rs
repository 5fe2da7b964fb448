//! Ledger facade.
//!
//! [`Ledger`] is the single entry point for the admin and user surfaces. Each
//! call runs exactly one unit of work (or one read) through the components,
//! and pool summaries are served from a [`PoolViewCache`] kept fresh by the
//! notifier registry.

use crate::adapter::outbound::notifier::LogNotifier;
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations, DbPool};
use crate::adapter::outbound::sqlite::{pool_store, unit::Database};
use crate::domain::id::{EntryId, OptionId, PoolId, Reference, UserId};
use crate::domain::money::Amount;
use crate::domain::payout::WinMeter;
use crate::domain::policy::LedgerPolicy;
use crate::domain::pool::{NewPool, Pool, PoolLedger, PoolOption, PoolPayout, PoolSummary};
use crate::domain::wallet::{BalanceChange, LedgerTransaction, ReplayReport, Wallet, WalletStatus};
use crate::error::Result;
use crate::infrastructure::config::jobs::JobsConfig;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::notifier::NotifierRegistry;

use super::cache::pool_view::PoolViewCache;
use super::deposit::{ConfirmedDeposit, DepositIntake};
use super::job::{JobRunner, PoolClaims};
use super::join::{JoinReceipt, PoolJoinEngine};
use super::pool_admin::PoolAdmin;
use super::refund::{RefundEngine, RefundReport};
use super::rollover::RolloverPool;
use super::settlement::{SettlementEngine, SettlementOutcome};
use super::wallet::WalletLedger;
use super::winmeter::WinMeterCalculator;

/// Admin and user operations over one database.
#[derive(Clone)]
pub struct Ledger {
    db: Database,
    policy: LedgerPolicy,
    views: PoolViewCache,
    claims: PoolClaims,
}

impl Ledger {
    /// Build a ledger over `pool`, registering the view cache on `notifiers`.
    #[must_use]
    pub fn new(pool: DbPool, policy: LedgerPolicy, mut notifiers: NotifierRegistry) -> Self {
        let views = PoolViewCache::new();
        notifiers.register(Box::new(views.clone()));
        Self {
            db: Database::with_notifiers(pool, notifiers),
            policy,
            views,
            claims: PoolClaims::new(),
        }
    }

    /// Open the configured database, apply migrations, and log committed
    /// events.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created or migrations fail.
    pub fn open(config: &Config) -> Result<Self> {
        let pool = create_pool(&config.database)?;
        run_migrations(&pool)?;
        let mut notifiers = NotifierRegistry::new();
        notifiers.register(Box::new(LogNotifier));
        Ok(Self::new(pool, config.ledger.policy(), notifiers))
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub const fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Job runner sharing this ledger's database and pool claims, so at
    /// most one job per pool runs across every runner it hands out.
    #[must_use]
    pub fn job_runner(&self, config: JobsConfig) -> JobRunner {
        JobRunner::with_claims(self.db.clone(), self.policy, config, self.claims.clone())
    }

    // Wallets

    /// # Errors
    /// Returns a store error.
    pub fn open_wallet(&self, owner: &UserId) -> Result<Wallet> {
        let wallet = WalletLedger::new(self.policy);
        self.db.unit(|uow| wallet.open(uow, owner))
    }

    /// # Errors
    /// See [`DepositIntake::confirm_deposit`].
    pub fn confirm_deposit(&self, deposit: &ConfirmedDeposit) -> Result<BalanceChange> {
        let intake = DepositIntake::new(self.policy);
        self.db.unit(|uow| intake.confirm_deposit(uow, deposit))
    }

    /// # Errors
    /// See [`WalletLedger::reverse`].
    pub fn reverse_transaction(&self, reference: &Reference, reason: &str) -> Result<BalanceChange> {
        let wallet = WalletLedger::new(self.policy);
        self.db.unit(|uow| wallet.reverse(uow, reference, reason))
    }

    /// # Errors
    /// See [`WalletLedger::set_status`].
    pub fn set_wallet_status(&self, owner: &UserId, status: WalletStatus) -> Result<()> {
        let wallet = WalletLedger::new(self.policy);
        self.db.unit(|uow| wallet.set_status(uow, owner, status))
    }

    /// # Errors
    /// Returns [`DomainError::WalletNotFound`](crate::domain::DomainError::WalletNotFound).
    pub fn wallet(&self, owner: &UserId) -> Result<Wallet> {
        let wallet = WalletLedger::new(self.policy);
        self.db.read(|conn| wallet.wallet(conn, owner))
    }

    /// # Errors
    /// Returns [`DomainError::WalletNotFound`](crate::domain::DomainError::WalletNotFound).
    pub fn balance(&self, owner: &UserId) -> Result<Amount> {
        let wallet = WalletLedger::new(self.policy);
        self.db.read(|conn| wallet.balance(conn, owner))
    }

    /// # Errors
    /// Returns [`DomainError::WalletNotFound`](crate::domain::DomainError::WalletNotFound).
    pub fn history(&self, owner: &UserId, limit: i64) -> Result<Vec<LedgerTransaction>> {
        let wallet = WalletLedger::new(self.policy);
        self.db.read(|conn| wallet.history(conn, owner, limit))
    }

    /// # Errors
    /// Returns [`DomainError::WalletNotFound`](crate::domain::DomainError::WalletNotFound).
    pub fn replay(&self, owner: &UserId) -> Result<ReplayReport> {
        let wallet = WalletLedger::new(self.policy);
        self.db.read(|conn| wallet.replay(conn, owner))
    }

    // Pools

    /// # Errors
    /// See [`PoolAdmin::create_pool`].
    pub fn create_pool(&self, new_pool: &NewPool) -> Result<Pool> {
        let admin = PoolAdmin::new(self.policy);
        self.db.unit(|uow| admin.create_pool(uow, new_pool))
    }

    /// # Errors
    /// See [`PoolAdmin::add_option`].
    pub fn add_option(&self, pool_id: PoolId, label: &str) -> Result<PoolOption> {
        let admin = PoolAdmin::new(self.policy);
        self.db.unit(|uow| admin.add_option(uow, pool_id, label))
    }

    /// # Errors
    /// See [`PoolAdmin::lock_pool`].
    pub fn lock_pool(&self, pool_id: PoolId) -> Result<Pool> {
        let admin = PoolAdmin::new(self.policy);
        self.db.unit(|uow| admin.lock_pool(uow, pool_id))
    }

    /// # Errors
    /// See [`PoolAdmin::close_pool`].
    pub fn close_pool(&self, pool_id: PoolId) -> Result<Pool> {
        let admin = PoolAdmin::new(self.policy);
        self.db.unit(|uow| admin.close_pool(uow, pool_id))
    }

    /// # Errors
    /// Returns [`DomainError::PoolNotFound`](crate::domain::DomainError::PoolNotFound).
    pub fn pool(&self, pool_id: PoolId) -> Result<Pool> {
        let admin = PoolAdmin::new(self.policy);
        self.db.read(|conn| admin.pool(conn, pool_id))
    }

    /// # Errors
    /// Returns a store error.
    pub fn pools(&self) -> Result<Vec<Pool>> {
        self.db.read(pool_store::list_pools)
    }

    /// # Errors
    /// Returns a store error.
    pub fn pool_options(&self, pool_id: PoolId) -> Result<Vec<PoolOption>> {
        self.db.read(|conn| pool_store::list_options(conn, pool_id))
    }

    /// Totals and participant counts, served from the view cache.
    ///
    /// # Errors
    /// Returns [`DomainError::PoolNotFound`](crate::domain::DomainError::PoolNotFound).
    pub fn pool_summary(&self, pool_id: PoolId) -> Result<PoolSummary> {
        self.db.read(|conn| self.views.get_or_load(conn, pool_id))
    }

    /// # Errors
    /// See [`PoolJoinEngine::join`].
    pub fn join_pool(
        &self,
        owner: &UserId,
        pool_id: PoolId,
        option_id: OptionId,
        amount: Amount,
        reference: Option<Reference>,
    ) -> Result<JoinReceipt> {
        let engine = PoolJoinEngine::new(self.policy);
        self.db
            .unit(|uow| engine.join(uow, owner, pool_id, option_id, amount, reference))
    }

    /// # Errors
    /// See [`WinMeterCalculator::estimate`].
    pub fn win_meter(&self, pool_id: PoolId, option_id: OptionId, stake: Amount) -> Result<WinMeter> {
        let calculator = WinMeterCalculator::new(self.policy);
        self.db
            .read(|conn| calculator.estimate(conn, pool_id, option_id, stake))
    }

    /// Settle inline, without job tracking or retry.
    ///
    /// # Errors
    /// See [`SettlementEngine::settle`].
    pub fn settle_pool(
        &self,
        pool_id: PoolId,
        winning_option_id: Option<OptionId>,
    ) -> Result<SettlementOutcome> {
        let engine = SettlementEngine::new(self.policy);
        self.db
            .unit(|uow| engine.settle(uow, pool_id, winning_option_id))
    }

    /// Refund inline, without job tracking or retry.
    ///
    /// # Errors
    /// See [`RefundEngine::refund`].
    pub fn refund_pool(
        &self,
        pool_id: PoolId,
        entry_ids: Option<&[EntryId]>,
        reason: &str,
    ) -> Result<RefundReport> {
        let engine = RefundEngine::new(self.policy);
        self.db
            .unit(|uow| engine.refund(uow, pool_id, entry_ids, reason))
    }

    /// # Errors
    /// Returns a store error.
    pub fn pool_ledger(&self, pool_id: PoolId) -> Result<Option<PoolLedger>> {
        let engine = SettlementEngine::new(self.policy);
        self.db.read(|conn| engine.ledger(conn, pool_id))
    }

    /// # Errors
    /// Returns a store error.
    pub fn payouts(&self, pool_id: PoolId) -> Result<Vec<PoolPayout>> {
        let engine = SettlementEngine::new(self.policy);
        self.db.read(|conn| engine.payouts(conn, pool_id))
    }

    // Rollover

    /// # Errors
    /// Returns a store error.
    pub fn rollover_balance(&self) -> Result<Amount> {
        let rollover = RolloverPool::new(self.policy);
        self.db.read(|conn| rollover.balance(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pool::PoolStatus;
    use crate::testkit::db::TempDb;
    use crate::testkit::fixtures::new_pool;
    use rust_decimal_macros::dec;

    fn ledger(temp: &TempDb) -> Ledger {
        Ledger::new(temp.pool().clone(), LedgerPolicy::default(), NotifierRegistry::new())
    }

    fn deposit(user: &str, amount: Amount, reference: &str) -> ConfirmedDeposit {
        ConfirmedDeposit {
            user_id: UserId::from(user),
            amount,
            external_reference: Reference::from(reference),
        }
    }

    #[test]
    fn deposit_join_settle_round() {
        let temp = TempDb::create("ledger-round");
        let ledger = ledger(&temp);
        let pool = ledger.create_pool(&new_pool(&["Home", "Away"])).unwrap();
        let options = ledger.pool_options(pool.id).unwrap();

        ledger.confirm_deposit(&deposit("alice", dec!(300), "gw-a")).unwrap();
        ledger.confirm_deposit(&deposit("bob", dec!(700), "gw-b")).unwrap();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        ledger
            .join_pool(&alice, pool.id, options[0].id, dec!(300), None)
            .unwrap();
        ledger
            .join_pool(&bob, pool.id, options[0].id, dec!(700), None)
            .unwrap();

        let meter = ledger.win_meter(pool.id, options[0].id, dec!(100)).unwrap();
        assert_eq!(meter.estimate, dec!(90));

        let outcome = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();
        assert!(matches!(outcome, SettlementOutcome::Settled(_)));
        assert_eq!(ledger.balance(&alice).unwrap(), dec!(270));
        assert_eq!(ledger.balance(&bob).unwrap(), dec!(630));
        assert_eq!(ledger.payouts(pool.id).unwrap().len(), 2);
        assert!(ledger.pool_ledger(pool.id).unwrap().is_some());
        assert!(ledger.replay(&alice).unwrap().is_consistent());
    }

    #[test]
    fn summary_reflects_lifecycle_changes() {
        let temp = TempDb::create("ledger-summary");
        let ledger = ledger(&temp);
        let pool = ledger.create_pool(&new_pool(&["Home", "Away"])).unwrap();

        let open = ledger.pool_summary(pool.id).unwrap();
        assert!(open.accepting_entries);

        ledger.add_option(pool.id, "Draw").unwrap();
        assert_eq!(ledger.pool_summary(pool.id).unwrap().options.len(), 3);

        ledger.lock_pool(pool.id).unwrap();
        let locked = ledger.pool_summary(pool.id).unwrap();
        assert_eq!(locked.status, PoolStatus::Locked);
        assert!(!locked.accepting_entries);

        ledger.close_pool(pool.id).unwrap();
        assert_eq!(ledger.pool(pool.id).unwrap().status, PoolStatus::Closed);
    }

    #[test]
    fn reversal_restores_balance() {
        let temp = TempDb::create("ledger-reverse");
        let ledger = ledger(&temp);
        ledger.confirm_deposit(&deposit("alice", dec!(50), "gw-1")).unwrap();

        let change = ledger
            .reverse_transaction(&Reference::from("gw-1"), "chargeback")
            .unwrap();

        assert_eq!(change.balance_after, dec!(0));
        let history = ledger.history(&UserId::from("alice"), 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(ledger.rollover_balance().unwrap(), dec!(0));
    }
}
