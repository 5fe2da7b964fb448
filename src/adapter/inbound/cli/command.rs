//! Command-line interface definitions.
//!
//! Defines the CLI structure for the parimutuel ledger using `clap`. The
//! admin surface (pools, settlement, refunds, reversals) and the user surface
//! (wallets, joins, win meter) share one binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Pari-mutuel ledger and settlement CLI
#[derive(Parser, Debug)]
#[command(name = "parimutuel")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file [default: ./parimutuel.toml if present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path, overriding the configuration
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or upgrade the database schema
    Migrate,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage wallets and balances
    #[command(subcommand)]
    Wallet(WalletCommand),

    /// Manage pools, entries, and settlement
    #[command(subcommand)]
    Pool(PoolCommand),

    /// Inspect the rollover balance
    #[command(subcommand)]
    Rollover(RolloverCommand),
}

/// Subcommands for `parimutuel config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate the configuration and exit.
    Validate,
    /// Display the effective configuration with defaults applied.
    Show,
}

/// Subcommands for `parimutuel wallet`.
#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Open a wallet (no-op if it exists).
    Open(UserArg),
    /// Apply a confirmed external deposit.
    Deposit(DepositArgs),
    /// Show the current balance.
    Balance(UserArg),
    /// Show recent transactions, newest first.
    History(HistoryArgs),
    /// Reverse a completed transaction by reference.
    Reverse(ReverseArgs),
    /// Block debits from a wallet.
    Freeze(UserArg),
    /// Allow debits from a frozen wallet again.
    Unfreeze(UserArg),
}

/// Subcommands for `parimutuel pool`.
#[derive(Subcommand, Debug)]
pub enum PoolCommand {
    /// Create a pool with its options.
    Create(CreatePoolArgs),
    /// Add an option to an open pool.
    AddOption(AddOptionArgs),
    /// Stop accepting entries.
    Lock(PoolArg),
    /// Close a pool ahead of settlement.
    Close(PoolArg),
    /// Stake on a pool option.
    Join(JoinArgs),
    /// Estimate the payout for a stake.
    Winmeter(WinMeterArgs),
    /// Settle a pool through the job runner.
    Settle(SettleArgs),
    /// Refund entries through the job runner.
    Refund(RefundArgs),
    /// Show pool totals and options.
    Show(PoolArg),
    /// List all pools.
    List,
}

/// Subcommands for `parimutuel rollover`.
#[derive(Subcommand, Debug)]
pub enum RolloverCommand {
    /// Show the current rollover balance.
    Balance,
}

#[derive(Parser, Debug)]
pub struct UserArg {
    /// Wallet owner.
    pub user: String,
}

#[derive(Parser, Debug)]
pub struct PoolArg {
    /// Pool id.
    pub pool: i64,
}

#[derive(Parser, Debug)]
pub struct DepositArgs {
    /// Wallet owner.
    pub user: String,
    /// Deposited amount.
    pub amount: Decimal,
    /// Payment gateway reference; a repeated reference is rejected.
    #[arg(long)]
    pub reference: String,
}

#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Wallet owner.
    pub user: String,
    /// Number of transactions to show.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: i64,
}

#[derive(Parser, Debug)]
pub struct ReverseArgs {
    /// Reference of the transaction to reverse.
    pub reference: String,
    /// Reason recorded on the reversal.
    #[arg(long, default_value = "manual reversal")]
    pub reason: String,
}

#[derive(Parser, Debug)]
pub struct CreatePoolArgs {
    /// Pool title.
    pub title: String,
    /// Option label (repeat for each option).
    #[arg(short, long = "option", required = true)]
    pub options: Vec<String>,
    /// Minimum stake per entry.
    #[arg(long, default_value = "1")]
    pub min_entry: Decimal,
    /// Hours until the pool stops accepting entries.
    #[arg(long, default_value_t = 24)]
    pub closes_in_hours: i64,
    /// Company cut in percent, overriding the configured default.
    #[arg(long)]
    pub company_cut: Option<Decimal>,
    /// Seed the pool with the current rollover balance.
    #[arg(long)]
    pub include_rollover: bool,
}

#[derive(Parser, Debug)]
pub struct AddOptionArgs {
    /// Pool id.
    pub pool: i64,
    /// Option label.
    pub label: String,
}

#[derive(Parser, Debug)]
pub struct JoinArgs {
    /// Wallet owner.
    pub user: String,
    /// Pool id.
    pub pool: i64,
    /// Option id.
    pub option: i64,
    /// Stake.
    pub amount: Decimal,
    /// Client reference; generated when omitted.
    #[arg(long)]
    pub reference: Option<String>,
}

#[derive(Parser, Debug)]
pub struct WinMeterArgs {
    /// Pool id.
    pub pool: i64,
    /// Option id.
    pub option: i64,
    /// Hypothetical stake.
    pub stake: Decimal,
}

#[derive(Parser, Debug)]
pub struct SettleArgs {
    /// Pool id.
    pub pool: i64,
    /// Winning option id; omit when nobody won.
    #[arg(long)]
    pub winner: Option<i64>,
}

#[derive(Parser, Debug)]
pub struct RefundArgs {
    /// Pool id.
    pub pool: i64,
    /// Entry id to refund (repeat; all active entries when omitted).
    #[arg(long = "entry")]
    pub entries: Vec<i64>,
    /// Reason recorded on each refund.
    #[arg(long, default_value = "pool refunded")]
    pub reason: String,
}
