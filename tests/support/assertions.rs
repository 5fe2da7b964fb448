use parimutuel::application::Ledger;
use parimutuel::domain::pool::PoolLedger;
use parimutuel::domain::UserId;
use rust_decimal::Decimal;

/// Cut, payouts, rollover, and rounding residual add back up to the pool.
pub fn assert_conserved(ledger: &PoolLedger) {
    assert!(
        ledger.total_payouts <= ledger.payout_pool,
        "payouts {} exceed payout pool {}",
        ledger.total_payouts,
        ledger.payout_pool
    );
    // Half a minor unit of rounding per winner at two decimal places.
    let bound = Decimal::new(5, 3) * Decimal::from(ledger.total_winners);
    assert!(
        ledger.rounding_residual() <= bound,
        "residual {} exceeds rounding bound {bound}",
        ledger.rounding_residual()
    );
    let accounted = ledger.company_cut
        + ledger.total_payouts
        + ledger.rollover_amount
        + ledger.rounding_residual();
    assert_eq!(
        accounted, ledger.total_pool,
        "cut + payouts + rollover + residual must equal the pool"
    );
}

/// Stored balance equals the replayed transaction log and is non-negative.
pub fn assert_replay_consistent(ledger: &Ledger, user: &str) {
    let report = ledger.replay(&UserId::from(user)).expect("replay wallet");
    assert!(
        report.is_consistent(),
        "stored {} != replayed {} for {user}",
        report.stored_balance,
        report.replayed_balance
    );
    assert!(report.stored_balance >= Decimal::ZERO, "negative balance for {user}");
}
