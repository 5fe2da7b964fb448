//! Builders for pools, wallets, and entries.
//!
//! Each helper runs its own unit of work and panics on failure, so tests
//! read as a list of preconditions followed by the assertion that matters.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::adapter::outbound::sqlite::pool_store;
use crate::adapter::outbound::sqlite::unit::Database;
use crate::application::join::{JoinReceipt, PoolJoinEngine};
use crate::application::pool_admin::PoolAdmin;
use crate::application::wallet::WalletLedger;
use crate::domain::id::UserId;
use crate::domain::policy::LedgerPolicy;
use crate::domain::pool::{NewPool, Pool, PoolOption};
use crate::domain::wallet::{TransactionKind, TransactionMeta};

/// Pool definition with a 10.00 minimum entry that closes in a week.
pub fn new_pool(options: &[&str]) -> NewPool {
    NewPool {
        title: "Test pool".to_string(),
        min_entry: dec!(10),
        closing_date: Utc::now() + Duration::days(7),
        company_cut_percent: None,
        include_rollover: false,
        options: options.iter().map(|o| (*o).to_string()).collect(),
    }
}

/// Create an open pool and return it with its options in label order.
pub fn open_pool(db: &Database, options: &[&str]) -> (Pool, Vec<PoolOption>) {
    create_pool(db, &new_pool(options))
}

pub fn create_pool(db: &Database, definition: &NewPool) -> (Pool, Vec<PoolOption>) {
    let admin = PoolAdmin::new(LedgerPolicy::default());
    let pool = db
        .unit(|uow| admin.create_pool(uow, definition))
        .expect("create pool");
    let options = db
        .read(|conn| pool_store::list_options(conn, pool.id))
        .expect("list options");
    (pool, options)
}

/// Open a wallet for `user` and deposit `amount` into it.
pub fn fund(db: &Database, user: &str, amount: Decimal) {
    let ledger = WalletLedger::new(LedgerPolicy::default());
    let owner = UserId::from(user);
    db.unit(|uow| {
        ledger.open(uow, &owner)?;
        ledger.credit(
            uow,
            &owner,
            amount,
            TransactionKind::Deposit,
            TransactionMeta::default().describe("test funding"),
        )
    })
    .expect("fund wallet");
}

/// Fund `user` with exactly `amount` and stake it on `option`.
pub fn join(db: &Database, user: &str, option: &PoolOption, amount: Decimal) -> JoinReceipt {
    fund(db, user, amount);
    let engine = PoolJoinEngine::new(LedgerPolicy::default());
    db.unit(|uow| {
        engine.join(
            uow,
            &UserId::from(user),
            option.pool_id,
            option.id,
            amount,
            None,
        )
    })
    .expect("join pool")
}

/// Current balance of `user`.
pub fn balance(db: &Database, user: &str) -> Decimal {
    let ledger = WalletLedger::new(LedgerPolicy::default());
    db.read(|conn| ledger.balance(conn, &UserId::from(user)))
        .expect("read balance")
}
