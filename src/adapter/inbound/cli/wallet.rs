//! Handlers for the `wallet` command group.

use serde_json::json;
use tabled::Tabled;

use super::command::{DepositArgs, HistoryArgs, ReverseArgs, UserArg, WalletCommand};
use super::output;
use crate::application::deposit::ConfirmedDeposit;
use crate::application::Ledger;
use crate::domain::id::{Reference, UserId};
use crate::domain::wallet::WalletStatus;
use crate::error::Result;

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Reference")]
    reference: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Execute a `wallet` subcommand.
pub fn execute(command: WalletCommand, ledger: &Ledger) -> Result<()> {
    match command {
        WalletCommand::Open(args) => open(ledger, &args),
        WalletCommand::Deposit(args) => deposit(ledger, args),
        WalletCommand::Balance(args) => balance(ledger, &args),
        WalletCommand::History(args) => history(ledger, &args),
        WalletCommand::Reverse(args) => reverse(ledger, &args),
        WalletCommand::Freeze(args) => set_status(ledger, &args, WalletStatus::Frozen),
        WalletCommand::Unfreeze(args) => set_status(ledger, &args, WalletStatus::Active),
    }
}

fn open(ledger: &Ledger, args: &UserArg) -> Result<()> {
    let wallet = ledger.open_wallet(&UserId::new(args.user.as_str()))?;
    output::json_output(json!({ "command": "wallet.open", "wallet": wallet }));
    output::success(&format!("Wallet ready for {}", output::highlight(&wallet.user_id)));
    output::field("Balance", wallet.balance);
    output::field("Status", wallet.status);
    Ok(())
}

fn deposit(ledger: &Ledger, args: DepositArgs) -> Result<()> {
    let deposit = ConfirmedDeposit {
        user_id: UserId::new(args.user),
        amount: args.amount,
        external_reference: Reference::new(args.reference),
    };
    let change = ledger.confirm_deposit(&deposit)?;
    output::json_output(json!({ "command": "wallet.deposit", "change": change }));
    output::success(&format!(
        "Deposited {} to {}",
        output::positive(deposit.amount),
        output::highlight(&deposit.user_id)
    ));
    output::field("Balance", change.balance_after);
    output::field("Reference", &change.reference);
    Ok(())
}

fn balance(ledger: &Ledger, args: &UserArg) -> Result<()> {
    let wallet = ledger.wallet(&UserId::new(args.user.as_str()))?;
    output::json_output(json!({
        "command": "wallet.balance",
        "user_id": wallet.user_id,
        "balance": wallet.balance,
        "status": wallet.status,
    }));
    output::section(&format!("Wallet {}", wallet.user_id));
    output::field("Balance", wallet.balance);
    output::field("Status", wallet.status);
    Ok(())
}

fn history(ledger: &Ledger, args: &HistoryArgs) -> Result<()> {
    let owner = UserId::new(args.user.as_str());
    let transactions = ledger.history(&owner, args.limit)?;
    output::json_output(json!({
        "command": "wallet.history",
        "user_id": owner,
        "transactions": transactions,
    }));

    output::section(&format!("History for {owner}"));
    let rows = transactions
        .iter()
        .map(|txn| TransactionRow {
            when: txn.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: txn.kind.to_string(),
            amount: output::signed(txn.signed_amount()),
            balance: txn.balance_after.to_string(),
            reference: txn.reference.to_string(),
            status: txn.status.to_string(),
        })
        .collect();
    output::table::<TransactionRow>(rows);
    Ok(())
}

fn reverse(ledger: &Ledger, args: &ReverseArgs) -> Result<()> {
    let change = ledger.reverse_transaction(&Reference::new(args.reference.as_str()), &args.reason)?;
    output::json_output(json!({ "command": "wallet.reverse", "change": change }));
    output::success(&format!("Reversed {}", output::highlight(&args.reference)));
    output::field("Reference", &change.reference);
    output::field("Balance", change.balance_after);
    Ok(())
}

fn set_status(ledger: &Ledger, args: &UserArg, status: WalletStatus) -> Result<()> {
    let owner = UserId::new(args.user.as_str());
    ledger.set_wallet_status(&owner, status)?;
    output::json_output(json!({
        "command": "wallet.status",
        "user_id": owner,
        "status": status,
    }));
    output::success(&format!("Wallet {owner} is now {status}"));
    Ok(())
}
