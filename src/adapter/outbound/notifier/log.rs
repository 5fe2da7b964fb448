//! Structured log output for committed events.

use tracing::info;

use crate::error::Result;
use crate::port::outbound::notifier::{Event, Notifier};

/// Log notifier that emits one `info` record per committed event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Event) -> Result<()> {
        match event {
            Event::BalanceChanged(e) => {
                info!(
                    user_id = %e.user_id,
                    kind = %e.kind,
                    amount = %e.amount,
                    balance = %e.balance_after,
                    reference = %e.reference,
                    "Balance changed"
                );
            }
            Event::DepositConfirmed {
                user_id,
                amount,
                reference,
            } => {
                info!(%user_id, %amount, %reference, "Deposit confirmed");
            }
            Event::PoolCreated {
                pool_id,
                title,
                rollover_seed,
            } => {
                info!(%pool_id, %title, %rollover_seed, "Pool created");
            }
            Event::PoolStatusChanged { pool_id, status } => {
                info!(%pool_id, %status, "Pool status changed");
            }
            Event::OptionAdded {
                pool_id,
                option_id,
                label,
            } => {
                info!(%pool_id, %option_id, %label, "Option added");
            }
            Event::PoolJoined(e) => {
                info!(
                    pool_id = %e.pool_id,
                    option_id = %e.option_id,
                    entry_id = %e.entry_id,
                    user_id = %e.user_id,
                    amount = %e.amount,
                    "Pool joined"
                );
            }
            Event::PoolSettled(e) => {
                info!(
                    pool_id = %e.pool_id,
                    outcome = %e.outcome,
                    winners = e.total_winners,
                    payouts = %e.total_payouts,
                    rollover = %e.rollover_amount,
                    "Pool settled"
                );
            }
            Event::PoolRefunded {
                pool_id,
                refunded_count,
                total_refunded,
            } => {
                info!(%pool_id, refunded_count, %total_refunded, "Pool refunded");
            }
            Event::RolloverChanged { balance } => {
                info!(%balance, "Rollover balance changed");
            }
            Event::JobFailed {
                pool_id,
                kind,
                attempts,
                error,
            } => {
                info!(%pool_id, %kind, attempts, %error, "Job failed");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::PoolId;
    use rust_decimal_macros::dec;

    #[test]
    fn log_notifier_accepts_every_event() {
        let notifier = LogNotifier;
        assert!(notifier
            .notify(&Event::RolloverChanged { balance: dec!(1) })
            .is_ok());
        assert!(notifier
            .notify(&Event::PoolRefunded {
                pool_id: PoolId::new(1),
                refunded_count: 0,
                total_refunded: dec!(0),
            })
            .is_ok());
        assert_eq!(notifier.name(), "log");
    }
}
