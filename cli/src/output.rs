//! Human-readable rendering of ledger results

use economics::{BatchReport, RewardRecord, StakingPosition, UnstakeOutcome};
use governance::{GovernanceProposal, Tally};
use ledger_core::{Balances, TokenClass};
use ledger_engine::SupplyAudit;
use owo_colors::OwoColorize;

const RULE: &str = "═══════════════════════════════════";

pub fn header(title: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", RULE);
}

fn field(label: &str, value: impl std::fmt::Display) {
    println!("{:<16} {}", format!("{}:", label).yellow(), value);
}

pub fn balances(account_id: &str, balances: &Balances) {
    header("💰 Balance");
    field("Account", account_id);
    for (class, amount) in balances.iter() {
        field(class.symbol(), amount.green());
    }
    println!();
}

pub fn reward(record: &RewardRecord) {
    header("🎁 Reward Issued");
    field("Reward", &record.id);
    field("Account", &record.account_id);
    field(
        "Tokens",
        format!("{} {}", record.token_amount, record.token_class.symbol()).green(),
    );
    field("Value", record.reference_value_amount);
    field("Reason", &record.reason);
    if let Some(external_ref) = &record.external_ref {
        field("Reference", external_ref);
    }
    println!();
}

pub fn position(position: &StakingPosition) {
    println!(
        "{} {} {} {}",
        position.id.bright_blue(),
        format!("{} {}", position.principal, position.token_class.symbol()).green(),
        format!("{:?}", position.status).yellow(),
        format!("unlocks {}", position.unlock_time.format("%Y-%m-%d %H:%M")),
    );
    println!(
        "    {} days at {}% APR{}, estimated yield {}",
        position.lock_days,
        position.apr_percent,
        if position.compounding { " compounding" } else { "" },
        position.estimated_yield
    );
    if let (Some(actual), Some(penalty)) = (position.actual_yield, position.penalty_applied) {
        println!("    paid yield {}, penalty {}", actual, penalty);
    }
}

pub fn unstake(outcome: &UnstakeOutcome) {
    header("🔓 Position Closed");
    let symbol = outcome.token_class.symbol();
    field("Position", &outcome.position_id);
    field(
        "Returned",
        format!("{} {}", outcome.returned_amount, symbol).green(),
    );
    field("Yield", outcome.yield_paid);
    if !outcome.penalty.is_zero() {
        field("Penalty", outcome.penalty.red());
        field("Burned", outcome.burned);
        field("Treasury", outcome.treasury_share);
        field("Staking pool", outcome.pool_share);
    }
    println!();
}

pub fn proposal(proposal: &GovernanceProposal) {
    println!(
        "{} {} {}",
        proposal.id.bright_blue(),
        proposal.title.bold(),
        format!("({:?}, ends {})", proposal.status, proposal.voting_end.format("%Y-%m-%d %H:%M"))
            .yellow()
    );
    println!("    options: {}", proposal.options.join(", "));
}

pub fn tally(tally: &Tally) {
    header(&format!("🗳️ {}", tally.title));
    field("Proposal", &tally.proposal_id);
    field(
        "Voting",
        if tally.voting_active {
            "open".green().to_string()
        } else {
            "closed".red().to_string()
        },
    );
    field("Votes", tally.total_votes);
    for option in &tally.options {
        println!(
            "  {:<12} {:>4} votes  {:>20}  {:>6.2}%",
            option.option, option.votes, option.weighted_votes, option.percentage
        );
    }
    if let Some(leader) = tally.leading_option() {
        field("Leading", leader.option.green());
    }
    println!();
}

pub fn audit(audits: &[SupplyAudit]) {
    header("🔍 Supply Audit");
    for audit in audits {
        let status = if audit.is_ok() {
            "OK".green().to_string()
        } else {
            "FAILED".red().bold().to_string()
        };
        println!("{} {}", audit.token_class.symbol().bold(), status);
        println!(
            "    liquid {} + staked {} + burned {}",
            audit.liquid, audit.active_principal, audit.burned
        );
        println!(
            "    awarded {} + yield {}; circulating {} (+{} reserved) of {}",
            audit.awarded,
            audit.yield_paid,
            audit.circulating_supply,
            audit.reserved,
            audit.total_supply
        );
    }
    println!();
}

pub fn batch(report: &BatchReport) {
    header("📦 Settlement");
    if report.skipped {
        println!("Batch interval not reached; use --force to flush now");
    } else {
        field("Submitted", report.submitted);
        field("Confirmed", report.confirmed.green());
        field("Requeued", report.requeued);
    }
    field("Pending", report.pending);
    println!();
}

pub fn class_choice(account_id: &str, class: TokenClass) {
    println!(
        "{} would be rewarded in {} ({})",
        account_id,
        class.symbol().green().bold(),
        class
    );
}
