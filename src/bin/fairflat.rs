//! CLI binary for fairflat.
//!
//! Each subcommand runs one household operation against the configured
//! ledger and prints JSON to stdout. Diagnostics go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use fairflat::{FairflatConfig, Household};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Fair chore rotation and point ledger for a shared flat.
#[derive(Parser)]
#[command(name = "fairflat", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the task catalogue.
    Tasks,

    /// Show who owes a task next.
    Next { task: String },

    /// Show a task's rules, next doer and last confirmed doer.
    Status { task: String },

    /// Claim a completed task.
    Claim { task: String, actor: String },

    /// Record cooking for everyone.
    Cook { actor: String },

    /// Record washing the dishes.
    Dishes {
        actor: String,
        /// Cooking record these dishes followed.
        #[arg(long)]
        after: Option<i64>,
    },

    /// Assign a penalty to another member.
    Penalize {
        reporter: String,
        target: String,
        penalty: String,
    },

    /// Confirm somebody else's claim.
    Confirm { record_id: i64, confirmer: String },

    /// Withdraw an unconfirmed claim.
    Retract { record_id: i64 },

    /// List unconfirmed claims.
    Pending,

    /// List members who may confirm a claim.
    Confirmers { record_id: i64 },

    /// Mark a member as home or away.
    Presence { identity: String, state: Presence },

    /// Show a member's balance.
    Balance { identity: String },

    /// Show a member's latest records.
    History {
        identity: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Weekly summary.
    Stats,

    /// Reset balances and queue pointers (admin only).
    Reset { by: String },

    /// Run the HTTP gateway.
    Serve,

    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Presence {
    Home,
    Away,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fairflat=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(FairflatConfig::default_config_path);

    if let Command::Init { force } = cli.command {
        return init_config(&config_path, force);
    }

    let config = FairflatConfig::from_file(&config_path).map_err(|e| {
        anyhow::anyhow!("failed to load config {}: {e}", config_path.display())
    })?;
    let household = Household::open(config)?;

    match cli.command {
        Command::Tasks => print_json(&household.list_tasks()),
        Command::Next { task } => print_json(&household.next_for(&task)?),
        Command::Status { task } => print_json(&household.task_status(&task)?),
        Command::Claim { task, actor } => print_record(household.claim_task(&task, &actor)?),
        Command::Cook { actor } => print_record(household.record_cooking(&actor)?),
        Command::Dishes { actor, after } => print_record(household.record_dishes(&actor, after)?),
        Command::Penalize {
            reporter,
            target,
            penalty,
        } => print_record(household.penalize(&reporter, &target, &penalty)?),
        Command::Confirm {
            record_id,
            confirmer,
        } => print_json(&household.confirm(record_id, &confirmer)?),
        Command::Retract { record_id } => print_json(&household.retract(record_id)?),
        Command::Pending => print_json(&household.pending_claims()?),
        Command::Confirmers { record_id } => {
            print_json(&household.eligible_confirmers(record_id)?)
        }
        Command::Presence { identity, state } => {
            household.set_presence(&identity, matches!(state, Presence::Home))?;
            print_json(&household.member(&identity)?)
        }
        Command::Balance { identity } => {
            let balance = household.balance_of(&identity)?;
            print_json(&serde_json::json!({"identity": identity, "balance": balance}))
        }
        Command::History { identity, limit } => {
            let limit = limit.unwrap_or(household.config().ledger.history_limit);
            print_json(&household.history_of(&identity, limit)?)
        }
        Command::Stats => print_json(&household.weekly_summary()?),
        Command::Reset { by } => print_json(&household.reset_all(&by)?),
        Command::Serve => {
            let gateway = household.config().gateway.clone();
            fairflat::gateway::run_gateway(gateway, Arc::new(household)).await
        }
        Command::Init { .. } => Ok(()),
    }
}

fn init_config(path: &std::path::Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    let mut config = FairflatConfig::with_members(vec![
        fairflat::config::MemberConfig::new("@first", "First"),
        fairflat::config::MemberConfig::new("@second", "Second"),
    ]);
    if let Some(first) = config.members.first_mut() {
        first.admin = true;
    }
    config.save_to_file(path)?;
    tracing::info!(path = %path.display(), "wrote default config");
    Ok(())
}

fn print_record(record_id: i64) -> anyhow::Result<()> {
    print_json(&serde_json::json!({ "record_id": record_id }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
