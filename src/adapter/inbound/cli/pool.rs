//! Handlers for the `pool` command group.

use chrono::{Duration, Utc};
use serde_json::json;
use tabled::Tabled;

use super::command::{
    AddOptionArgs, CreatePoolArgs, JoinArgs, PoolArg, PoolCommand, RefundArgs, SettleArgs,
    WinMeterArgs,
};
use super::output;
use crate::application::job::{JobOutcome, JobReport};
use crate::application::Ledger;
use crate::domain::id::{EntryId, OptionId, PoolId, Reference, UserId};
use crate::domain::job::JobRequest;
use crate::domain::pool::{NewPool, PoolLedger};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Option")]
    label: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Stake")]
    stake: String,
    #[tabled(rename = "Entries")]
    participants: i32,
}

#[derive(Tabled)]
struct PoolRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Pool")]
    total: String,
    #[tabled(rename = "Closes")]
    closes: String,
}

/// Execute a `pool` subcommand.
pub async fn execute(command: PoolCommand, ledger: &Ledger, config: &Config) -> Result<()> {
    match command {
        PoolCommand::Create(args) => create(ledger, args),
        PoolCommand::AddOption(args) => add_option(ledger, &args),
        PoolCommand::Lock(args) => lock(ledger, &args),
        PoolCommand::Close(args) => close(ledger, &args),
        PoolCommand::Join(args) => join(ledger, args),
        PoolCommand::Winmeter(args) => winmeter(ledger, &args),
        PoolCommand::Settle(args) => settle(ledger, config, &args).await,
        PoolCommand::Refund(args) => refund(ledger, config, args).await,
        PoolCommand::Show(args) => show(ledger, &args),
        PoolCommand::List => list(ledger),
    }
}

fn create(ledger: &Ledger, args: CreatePoolArgs) -> Result<()> {
    let pool = ledger.create_pool(&NewPool {
        title: args.title,
        min_entry: args.min_entry,
        closing_date: Utc::now() + Duration::hours(args.closes_in_hours),
        company_cut_percent: args.company_cut,
        include_rollover: args.include_rollover,
        options: args.options,
    })?;
    let options = ledger.pool_options(pool.id)?;

    output::json_output(json!({
        "command": "pool.create",
        "pool": pool,
        "options": options,
    }));
    output::success(&format!(
        "Created pool {} {}",
        output::highlight(pool.id),
        pool.title
    ));
    output::field("Closes", pool.closing_date.to_rfc3339());
    output::field("Min entry", pool.min_entry);
    if !pool.rollover_seed.is_zero() {
        output::field("Rollover seed", output::positive(pool.rollover_seed));
    }
    for option in &options {
        output::field(&format!("Option {}", option.id), &option.label);
    }
    Ok(())
}

fn add_option(ledger: &Ledger, args: &AddOptionArgs) -> Result<()> {
    let option = ledger.add_option(PoolId::new(args.pool), &args.label)?;
    output::json_output(json!({ "command": "pool.add_option", "option": option }));
    output::success(&format!(
        "Added option {} {} to pool {}",
        output::highlight(option.id),
        option.label,
        option.pool_id
    ));
    Ok(())
}

fn lock(ledger: &Ledger, args: &PoolArg) -> Result<()> {
    let pool = ledger.lock_pool(PoolId::new(args.pool))?;
    output::json_output(json!({ "command": "pool.lock", "pool": pool }));
    output::success(&format!("Pool {} is {}", pool.id, pool.status));
    Ok(())
}

fn close(ledger: &Ledger, args: &PoolArg) -> Result<()> {
    let pool = ledger.close_pool(PoolId::new(args.pool))?;
    output::json_output(json!({ "command": "pool.close", "pool": pool }));
    output::success(&format!("Pool {} is {}", pool.id, pool.status));
    Ok(())
}

fn join(ledger: &Ledger, args: JoinArgs) -> Result<()> {
    let receipt = ledger.join_pool(
        &UserId::new(args.user.as_str()),
        PoolId::new(args.pool),
        OptionId::new(args.option),
        args.amount,
        args.reference.map(Reference::new),
    )?;
    output::json_output(json!({ "command": "pool.join", "receipt": receipt }));
    output::success(&format!(
        "{} staked {} on option {}",
        args.user,
        output::highlight(args.amount),
        args.option
    ));
    output::field("Entry", receipt.entry_id);
    output::field("Reference", &receipt.reference);
    output::field("Balance", receipt.balance_after);
    Ok(())
}

fn winmeter(ledger: &Ledger, args: &WinMeterArgs) -> Result<()> {
    let meter = ledger.win_meter(
        PoolId::new(args.pool),
        OptionId::new(args.option),
        args.stake,
    )?;
    output::json_output(json!({ "command": "pool.winmeter", "meter": meter }));
    output::section("Win meter");
    output::field("Stake", meter.stake);
    output::field("Option total", meter.option_total);
    output::field("Payout pool", meter.payout_pool);
    output::field("Estimate", output::positive(meter.estimate));
    output::field("Multiplier", format!("{}x", meter.multiplier));
    output::hint("estimates move as other entries arrive");
    Ok(())
}

async fn settle(ledger: &Ledger, config: &Config, args: &SettleArgs) -> Result<()> {
    let report = ledger
        .job_runner(config.jobs.clone())
        .run(JobRequest::Settle {
            pool_id: PoolId::new(args.pool),
            winning_option_id: args.winner.map(OptionId::new),
        })
        .await?;
    print_job(&report);
    Ok(())
}

async fn refund(ledger: &Ledger, config: &Config, args: RefundArgs) -> Result<()> {
    let entry_ids = if args.entries.is_empty() {
        None
    } else {
        Some(args.entries.into_iter().map(EntryId::new).collect())
    };
    let report = ledger
        .job_runner(config.jobs.clone())
        .run(JobRequest::Refund {
            pool_id: PoolId::new(args.pool),
            entry_ids,
            reason: args.reason,
        })
        .await?;
    print_job(&report);
    Ok(())
}

fn print_job(report: &JobReport) {
    output::json_output(json!({ "command": "pool.job", "report": report }));

    match &report.outcome {
        JobOutcome::Settled(outcome) => {
            if outcome.is_already_settled() {
                output::warning(&format!("Pool {} was already settled", report.pool_id));
            } else {
                output::success(&format!("Settled pool {}", report.pool_id));
            }
            print_ledger(outcome.ledger());
        }
        JobOutcome::Refunded(refund) => {
            output::success(&format!(
                "Refunded {} entries in pool {}",
                refund.refunded_count, report.pool_id
            ));
            output::field("Refunded", refund.total_refunded);
            output::field("Pool status", refund.pool_status);
            if !refund.returned_seed.is_zero() {
                output::field("Seed returned", refund.returned_seed);
            }
        }
    }
    output::field("Job", format!("{} ({} attempt(s))", report.job_id, report.attempts));
}

fn print_ledger(ledger: &PoolLedger) {
    output::field("Outcome", ledger.outcome);
    output::field("Total pool", ledger.total_pool);
    output::field(
        "Company cut",
        format!("{} ({}%)", ledger.company_cut, ledger.company_cut_percent),
    );
    output::field("Payout pool", ledger.payout_pool);
    output::field("Winners", ledger.total_winners);
    output::field("Paid out", output::positive(ledger.total_payouts));
    if !ledger.rollover_amount.is_zero() {
        output::field("Rolled over", ledger.rollover_amount);
    }
}

fn show(ledger: &Ledger, args: &PoolArg) -> Result<()> {
    let pool_id = PoolId::new(args.pool);
    let summary = ledger.pool_summary(pool_id)?;
    let settlement = ledger.pool_ledger(pool_id)?;
    output::json_output(json!({
        "command": "pool.show",
        "summary": summary,
        "ledger": settlement,
    }));

    output::section(&format!("Pool {} {}", summary.pool_id, summary.title));
    output::field("Status", summary.status);
    output::field("Accepting", summary.accepting_entries);
    output::field("Closes", summary.closing_date.to_rfc3339());
    output::field("Stake", summary.total_stake);
    output::field("Pool", summary.total_pool_amount);
    output::field("Entries", summary.participants);
    let rows = summary
        .options
        .iter()
        .map(|option| OptionRow {
            id: option.option_id.get(),
            label: option.label.clone(),
            status: option.status.to_string(),
            stake: option.total_stake.to_string(),
            participants: option.participants,
        })
        .collect();
    output::table::<OptionRow>(rows);

    if let Some(settlement) = &settlement {
        output::section("Settlement");
        print_ledger(settlement);
    }
    Ok(())
}

fn list(ledger: &Ledger) -> Result<()> {
    let pools = ledger.pools()?;
    output::json_output(json!({ "command": "pool.list", "pools": pools }));

    output::section("Pools");
    let rows = pools
        .iter()
        .map(|pool| PoolRow {
            id: pool.id.get(),
            title: pool.title.clone(),
            status: pool.status.to_string(),
            total: pool.total_pool_amount.to_string(),
            closes: pool.closing_date.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    output::table::<PoolRow>(rows);
    Ok(())
}
