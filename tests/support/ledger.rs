use parimutuel::application::deposit::ConfirmedDeposit;
use parimutuel::application::join::JoinReceipt;
use parimutuel::application::Ledger;
use parimutuel::domain::pool::{Pool, PoolOption};
use parimutuel::domain::{Amount, LedgerPolicy, Reference, UserId};
use parimutuel::port::NotifierRegistry;
use parimutuel::testkit::db::TempDb;
use parimutuel::testkit::fixtures::new_pool;

/// Ledger over a temp database with the default policy.
pub fn ledger(temp: &TempDb) -> Ledger {
    Ledger::new(
        temp.pool().clone(),
        LedgerPolicy::default(),
        NotifierRegistry::new(),
    )
}

/// Open pool with the given option labels.
pub fn open_pool(ledger: &Ledger, labels: &[&str]) -> (Pool, Vec<PoolOption>) {
    let pool = ledger.create_pool(&new_pool(labels)).expect("create pool");
    let options = ledger.pool_options(pool.id).expect("list options");
    (pool, options)
}

/// Deposit `amount` for `user` under a unique gateway reference.
pub fn deposit(ledger: &Ledger, user: &str, amount: Amount) {
    ledger
        .confirm_deposit(&ConfirmedDeposit {
            user_id: UserId::from(user),
            amount,
            external_reference: Reference::generate("gw"),
        })
        .expect("confirm deposit");
}

/// Deposit exactly `amount` and stake it on `option`.
pub fn stake(ledger: &Ledger, user: &str, option: &PoolOption, amount: Amount) -> JoinReceipt {
    deposit(ledger, user, amount);
    ledger
        .join_pool(&UserId::from(user), option.pool_id, option.id, amount, None)
        .expect("join pool")
}
