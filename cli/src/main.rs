//! Command-line front end for the token ledger
//!
//! Every invocation loads the ledger snapshot from the data directory, runs
//! one command and saves the result back.

mod gateway;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gateway::LoggingGateway;
use ledger_core::{Amount, Clock, LedgerConfig, SystemClock, TokenClass};
use ledger_engine::TokenLedger;
use ledger_storage::{SledStore, SnapshotStore};
use log::info;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

const SNAPSHOT_NAME: &str = "current";

#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "Dual-class token ledger", version)]
struct Cli {
    /// Directory holding the ledger database
    #[arg(short, long, value_name = "DIR", default_value = "ledger-data")]
    data_dir: PathBuf,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show an account's balances
    Balance { account: String },

    /// Award tokens for a reference value
    Award {
        account: String,
        value: Amount,
        /// Token class; chosen from the account's eligibility when omitted
        #[arg(long)]
        class: Option<TokenClass>,
        #[arg(long, default_value = "manual award")]
        reason: String,
        /// External reference; an award already recorded under it is not repeated
        #[arg(long = "ref")]
        external_ref: Option<String>,
    },

    /// Show which class an award of `value` would use
    SelectClass { account: String, value: Amount },

    /// Make an account eligible for premium rewards
    Upgrade { account: String },

    /// Lock tokens in a staking position
    Stake {
        account: String,
        class: TokenClass,
        amount: Amount,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Close a staking position
    Unstake {
        position: String,
        /// Exit before unlock, paying the penalty
        #[arg(long)]
        emergency: bool,
        /// Only close the position if it belongs to this account
        #[arg(long)]
        account: Option<String>,
    },

    /// List an account's staking positions
    Positions { account: String },

    /// Create a governance proposal
    Propose {
        account: String,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Voting option; repeat for several, defaults to Yes and No
        #[arg(long = "option")]
        options: Vec<String>,
    },

    /// Vote on a proposal
    Vote {
        account: String,
        proposal: String,
        option: String,
    },

    /// Show the current tally of a proposal
    Tally { proposal: String },

    /// List proposals
    Proposals {
        /// Include closed proposals
        #[arg(long)]
        all: bool,
    },

    /// Supply, reward, staking and settlement statistics
    Stats,

    /// Check supply conservation for every class
    Audit,

    /// Send pending settlement events
    Flush {
        /// Flush even if the batch interval has not elapsed
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct StatsReport {
    supply: Vec<(TokenClass, economics::SupplyStats)>,
    rewards: economics::RewardStats,
    staking: economics::StakingStats,
    burns: economics::BurnStats,
    governance: governance::GovernanceStats,
    settlement: economics::SettlementStats,
    pending_settlements: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LedgerConfig::default(),
    };

    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("failed to create {}", cli.data_dir.display()))?;
    let store = SnapshotStore::new(SledStore::open(cli.data_dir.join("ledger.db"))?);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ledger = TokenLedger::load_or_new(
        config,
        clock,
        Arc::new(LoggingGateway),
        &store,
        SNAPSHOT_NAME,
    )?;

    let outcome = run(&ledger, cli.command, cli.json);

    // Failed commands leave the ledger unchanged, saving is still safe
    ledger.save(&store, SNAPSHOT_NAME)?;
    outcome
}

fn run(ledger: &TokenLedger, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Balance { account } => {
            let balances = ledger.balances(&account);
            if json {
                return print_json(&balances);
            }
            output::balances(&account, &balances);
        }

        Commands::Award {
            account,
            value,
            class,
            reason,
            external_ref,
        } => {
            if let Some(existing) = external_ref
                .as_deref()
                .and_then(|r| ledger.rewards().reward_by_external_ref(r))
            {
                info!("Reward {} already recorded, not repeating it", existing.id);
                if json {
                    return print_json(&existing);
                }
                println!("{}", "Award already recorded for this reference".yellow());
                output::reward(&existing);
                return Ok(());
            }

            let class = class.unwrap_or_else(|| ledger.select_token_class(&account, value));
            let record = match external_ref.as_deref() {
                Some(r) => ledger.award_with_ref(&account, value, class, &reason, r)?,
                None => ledger.award(&account, value, class, &reason)?,
            };
            if json {
                return print_json(&record);
            }
            output::reward(&record);
        }

        Commands::SelectClass { account, value } => {
            let class = ledger.select_token_class(&account, value);
            if json {
                return print_json(&class);
            }
            output::class_choice(&account, class);
        }

        Commands::Upgrade { account } => {
            ledger.upgrade_to_premium(&account);
            if !json {
                println!("{} {} is premium eligible", "✓".green(), account);
            }
        }

        Commands::Stake {
            account,
            class,
            amount,
            days,
        } => {
            let position = ledger.stake(&account, class, amount, days)?;
            if json {
                return print_json(&position);
            }
            output::header("🔒 Position Opened");
            output::position(&position);
            println!();
        }

        Commands::Unstake {
            position,
            emergency,
            account,
        } => {
            let outcome = match account {
                Some(account) => ledger.unstake_for(&account, &position, emergency)?,
                None => ledger.unstake(&position, emergency)?,
            };
            if json {
                return print_json(&outcome);
            }
            output::unstake(&outcome);
        }

        Commands::Positions { account } => {
            let positions = ledger.staking().positions_for(&account);
            if json {
                return print_json(&positions);
            }
            output::header(&format!("📈 Positions of {}", account));
            if positions.is_empty() {
                println!("No staking positions");
            }
            for position in &positions {
                output::position(position);
            }
            println!();
        }

        Commands::Propose {
            account,
            title,
            description,
            options,
        } => {
            let proposal = ledger.create_proposal(&account, &title, &description, options)?;
            if json {
                return print_json(&proposal);
            }
            output::header("📜 Proposal Created");
            output::proposal(&proposal);
            println!();
        }

        Commands::Vote {
            account,
            proposal,
            option,
        } => {
            let vote = ledger.vote(&account, &proposal, &option)?;
            if json {
                return print_json(&vote);
            }
            println!(
                "{} {} voted {} with power {}",
                "✓".green(),
                vote.account_id,
                vote.option.bold(),
                vote.voting_power
            );
        }

        Commands::Tally { proposal } => {
            let tally = ledger.tally(&proposal)?;
            if json {
                return print_json(&tally);
            }
            output::tally(&tally);
        }

        Commands::Proposals { all } => {
            let closed = ledger.governance().close_expired();
            if !closed.is_empty() {
                info!("Closed {} expired proposals", closed.len());
            }
            let proposals = if all {
                ledger.governance().proposals()
            } else {
                ledger.governance().active_proposals()
            };
            if json {
                return print_json(&proposals);
            }
            output::header("🗳️ Proposals");
            if proposals.is_empty() {
                println!("No proposals");
            }
            for proposal in &proposals {
                output::proposal(proposal);
            }
            println!();
        }

        Commands::Stats => {
            let report = StatsReport {
                supply: TokenClass::ALL
                    .into_iter()
                    .map(|class| (class, ledger.supply().stats(class)))
                    .collect(),
                rewards: ledger.rewards().stats(),
                staking: ledger.staking().stats(),
                burns: ledger.burns().stats(),
                governance: ledger.governance().stats(),
                settlement: ledger.settlement().stats(),
                pending_settlements: ledger.settlement().pending_count(),
            };
            if json {
                return print_json(&report);
            }
            print_stats(&report);
        }

        Commands::Audit => {
            let audits = ledger.audit();
            let ok = audits.iter().all(|audit| audit.is_ok());
            if json {
                print_json(&audits)?;
            } else {
                output::audit(&audits);
            }
            if !ok {
                bail!("supply audit failed");
            }
        }

        Commands::Flush { force } => {
            let report = ledger.flush(force)?;
            if json {
                return print_json(&report);
            }
            output::batch(&report);
        }
    }
    Ok(())
}

fn print_stats(report: &StatsReport) {
    output::header("📊 Ledger Statistics");
    for (class, supply) in &report.supply {
        println!(
            "{:<8} circulating {} of {} (minted {}, burned {}, reserved {})",
            class.symbol().bold(),
            supply.circulating_supply,
            supply.total_supply,
            supply.total_minted,
            supply.total_burned,
            supply.reserved
        );
    }
    println!(
        "Rewards: {} issued for {} in value",
        report.rewards.total_rewards_count, report.rewards.total_value_awarded
    );
    println!(
        "Staking: {} opened, {} closed, {} emergency exits",
        report.staking.positions_opened,
        report.staking.positions_closed,
        report.staking.emergency_exits
    );
    println!(
        "Governance: {} proposals ({} active), {} votes",
        report.governance.total_proposals,
        report.governance.active_proposals,
        report.governance.total_votes
    );
    println!(
        "Settlement: {} confirmed, {} pending, {} failed batches",
        report.settlement.total_confirmed,
        report.pending_settlements,
        report.settlement.failed_batches
    );
    println!();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
