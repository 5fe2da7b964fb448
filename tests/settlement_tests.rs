//! Settlement, rollover, and refund flows through the ledger facade.

mod support;

use parimutuel::application::settlement::SettlementOutcome;
use parimutuel::domain::pool::{NewPool, PayoutStatus, PoolStatus};
use parimutuel::domain::{DomainError, UserId};
use parimutuel::error::Error;
use parimutuel::testkit::db::TempDb;
use parimutuel::testkit::fixtures::new_pool;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use support::assertions::{assert_conserved, assert_replay_consistent};
use support::ledger::{ledger, open_pool, stake};

#[test]
fn single_winner_takes_payout_pool() {
    let temp = TempDb::create("settle_single");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(600));
    stake(&ledger, "bob", &options[1], dec!(400));

    let outcome = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();

    let SettlementOutcome::Settled(settled) = outcome else {
        panic!("expected winners to be paid");
    };
    assert_eq!(settled.total_pool, dec!(1000));
    assert_eq!(settled.company_cut, dec!(100));
    assert_eq!(settled.payout_pool, dec!(900));
    assert_eq!(settled.total_payouts, dec!(900));
    assert_eq!(ledger.balance(&UserId::from("alice")).unwrap(), dec!(900));
    assert_eq!(ledger.balance(&UserId::from("bob")).unwrap(), Decimal::ZERO);
    assert_conserved(&settled);
    assert_replay_consistent(&ledger, "alice");
    assert_replay_consistent(&ledger, "bob");
}

#[test]
fn winners_split_in_proportion_to_stake() {
    let temp = TempDb::create("settle_split");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(300));
    stake(&ledger, "bob", &options[0], dec!(700));

    let outcome = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();

    assert_eq!(outcome.ledger().total_winners, 2);
    assert_eq!(ledger.balance(&UserId::from("alice")).unwrap(), dec!(270));
    assert_eq!(ledger.balance(&UserId::from("bob")).unwrap(), dec!(630));
    let payouts = ledger.payouts(pool.id).unwrap();
    assert_eq!(payouts.len(), 2);
    assert!(payouts.iter().all(|p| p.status == PayoutStatus::Completed));
    assert!(payouts
        .iter()
        .all(|p| p.txn_ref.as_str().starts_with(&format!("payout-{}-", pool.id))));
    assert_conserved(outcome.ledger());
}

#[test]
fn uneven_split_stays_within_rounding() {
    let temp = TempDb::create("settle_rounding");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(10));
    stake(&ledger, "bob", &options[0], dec!(10));
    stake(&ledger, "carol", &options[0], dec!(10));
    stake(&ledger, "dave", &options[1], dec!(10.01));

    let outcome = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();

    // 40.01 less a 4.00 cut leaves 36.01; three equal shares of 12.00.
    assert_eq!(outcome.ledger().total_payouts, dec!(36));
    assert_eq!(outcome.ledger().rounding_residual(), dec!(0.01));
    assert_conserved(outcome.ledger());
    for user in ["alice", "bob", "carol", "dave"] {
        assert_replay_consistent(&ledger, user);
    }
}

#[test]
fn repeated_settle_is_idempotent() {
    let temp = TempDb::create("settle_idempotent");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(100));

    let first = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();
    let second = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();

    assert!(!first.is_already_settled());
    assert!(second.is_already_settled());
    assert_eq!(second.ledger().total_payouts, first.ledger().total_payouts);
    assert_eq!(ledger.balance(&UserId::from("alice")).unwrap(), dec!(90));
    assert_eq!(ledger.history(&UserId::from("alice"), 10).unwrap().len(), 3);
}

#[test]
fn losing_entries_are_marked_and_options_eliminated() {
    let temp = TempDb::create("settle_losers");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(50));
    stake(&ledger, "bob", &options[1], dec!(50));

    ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();

    let summary = ledger.pool_summary(pool.id).unwrap();
    assert_eq!(summary.status, PoolStatus::Settled);
    assert!(!summary.accepting_entries);
    let payouts = ledger.payouts(pool.id).unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].user_id, UserId::from("alice"));
}

#[test]
fn no_winner_rolls_over_into_next_pool() {
    let temp = TempDb::create("settle_rollover");
    let ledger = ledger(&temp);
    let (first, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(200));

    let outcome = ledger.settle_pool(first.id, None).unwrap();
    let SettlementOutcome::RolledOver(rolled) = outcome else {
        panic!("expected rollover");
    };
    assert_eq!(rolled.rollover_amount, dec!(180));
    assert_eq!(ledger.rollover_balance().unwrap(), dec!(180));
    assert_eq!(ledger.pool(first.id).unwrap().status, PoolStatus::Rollover);
    assert_conserved(&rolled);

    let seeded = ledger
        .create_pool(&NewPool {
            include_rollover: true,
            ..new_pool(&["Home", "Away"])
        })
        .unwrap();
    assert_eq!(seeded.rollover_seed, dec!(180));
    assert_eq!(ledger.rollover_balance().unwrap(), Decimal::ZERO);

    let seeded_options = ledger.pool_options(seeded.id).unwrap();
    stake(&ledger, "bob", &seeded_options[0], dec!(20));
    let outcome = ledger
        .settle_pool(seeded.id, Some(seeded_options[0].id))
        .unwrap();

    // 180 seed + 20 stake, less the 10% cut.
    assert_eq!(outcome.ledger().total_pool, dec!(200));
    assert_eq!(ledger.balance(&UserId::from("bob")).unwrap(), dec!(180));
    assert_conserved(outcome.ledger());
}

#[test]
fn unknown_winning_option_is_rejected_and_nothing_moves() {
    let temp = TempDb::create("settle_bad_option");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(100));

    let err = ledger
        .settle_pool(pool.id, Some(parimutuel::domain::OptionId::new(9999)))
        .unwrap_err();

    assert!(matches!(
        err.as_domain(),
        Some(DomainError::OptionNotFound { .. })
    ));
    assert_eq!(ledger.pool(pool.id).unwrap().status, PoolStatus::Open);
    assert!(ledger.pool_ledger(pool.id).unwrap().is_none());
}

#[test]
fn full_refund_returns_stakes_once() {
    let temp = TempDb::create("refund_full");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(40));
    stake(&ledger, "bob", &options[1], dec!(60));

    let report = ledger.refund_pool(pool.id, None, "event cancelled").unwrap();
    assert_eq!(report.refunded_count, 2);
    assert_eq!(report.total_refunded, dec!(100));
    assert_eq!(report.pool_status, PoolStatus::Refunded);

    let again = ledger.refund_pool(pool.id, None, "event cancelled").unwrap();
    assert_eq!(again.refunded_count, 0);
    assert_eq!(ledger.balance(&UserId::from("alice")).unwrap(), dec!(40));
    assert_eq!(ledger.balance(&UserId::from("bob")).unwrap(), dec!(60));
    assert_replay_consistent(&ledger, "alice");

    let err = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap_err();
    assert!(matches!(
        err,
        Error::Domain(DomainError::InvalidTransition { .. })
    ));
}

#[test]
fn partial_refund_leaves_pool_settleable() {
    let temp = TempDb::create("refund_partial");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    stake(&ledger, "alice", &options[0], dec!(100));
    let bob = stake(&ledger, "bob", &options[0], dec!(100));

    let report = ledger
        .refund_pool(pool.id, Some(&[bob.entry_id]), "duplicate account")
        .unwrap();
    assert_eq!(report.refunded_count, 1);
    assert_eq!(report.entries[0].user_id, UserId::from("bob"));
    assert_eq!(
        report.entries[0].reference.as_str(),
        format!("refund-{}-{}", pool.id, bob.entry_id)
    );
    assert_ne!(report.pool_status, PoolStatus::Refunded);
    assert_eq!(ledger.balance(&UserId::from("bob")).unwrap(), dec!(100));

    let outcome = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();
    assert_eq!(outcome.ledger().total_pool, dec!(100));
    assert_eq!(ledger.balance(&UserId::from("alice")).unwrap(), dec!(90));
    assert_conserved(outcome.ledger());
}

#[test]
fn large_stakes_settle_without_overflow() {
    let temp = TempDb::create("settle_large");
    let ledger = ledger(&temp);
    let (pool, options) = open_pool(&ledger, &["Yes", "No"]);
    let big = dec!(1000000000000000);
    stake(&ledger, "alice", &options[0], big);
    stake(&ledger, "bob", &options[0], big);

    let outcome = ledger.settle_pool(pool.id, Some(options[0].id)).unwrap();

    assert_eq!(outcome.ledger().payout_pool, dec!(1800000000000000));
    assert_eq!(ledger.balance(&UserId::from("alice")).unwrap(), dec!(900000000000000));
    assert_eq!(ledger.balance(&UserId::from("bob")).unwrap(), dec!(900000000000000));
    assert_conserved(outcome.ledger());
}
