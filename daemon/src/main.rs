//! Subledger daemon: entry point for administering and serving a subscription ledger.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use subledger_engine::{SubscriptionEngine, SubscriptionEvent};
use subledger_rpc::RpcServer;
use subledger_store::SubscriptionStore;
use subledger_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use subledger_types::{AccountId, Amount, SubscriptionPeriod, SystemClock};
use subledger_utils::{format_duration, init_logging, LogFormat};

use crate::config::{DaemonConfig, LedgerSection};

#[derive(Parser)]
#[command(name = "subledger", about = "Periodic subscription ledger")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "SUBLEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for ledger storage.
    #[arg(long, env = "SUBLEDGER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SUBLEDGER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SUBLEDGER_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Initialise a new ledger in the data directory.
    Init {
        /// Billing period: weekly, biweekly or monthly.
        #[arg(long)]
        period: Option<SubscriptionPeriod>,
        /// Cost of one period in the smallest currency unit.
        #[arg(long)]
        period_cost: Option<String>,
        /// Account that owns the ledger.
        #[arg(long)]
        owner: Option<String>,
    },
    /// Run the RPC server.
    Serve {
        #[arg(long, env = "SUBLEDGER_RPC_PORT")]
        rpc_port: Option<u16>,
    },
    /// Show ledger configuration and database health.
    Info,
    /// Show an account's standing.
    Status { account: AccountId },
    /// Open a subscription with a deposit.
    Subscribe { account: AccountId, value: Amount },
    /// Add value to an active subscription.
    Increase { account: AccountId, value: Amount },
    /// Withdraw the account's available balance.
    Withdraw { account: AccountId },
    /// List journaled transfers.
    Journal {
        /// Only show transfers with a sequence number greater than this.
        #[arg(long, default_value_t = 0)]
        after: u64,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => DaemonConfig::from_toml_file(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    init_logging(config.log_format, &config.log_level)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;
    if let Some(ref path) = cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
    let environment = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening ledger at {}", config.data_dir.display()))?;

    match cli.command {
        Command::Init {
            period,
            period_cost,
            owner,
        } => {
            let params = config.ledger_params(&LedgerSection {
                period,
                period_cost,
                owner,
            })?;
            let engine = SubscriptionEngine::construct(
                Arc::new(environment.subscription_store()),
                Arc::new(SystemClock),
                Arc::new(environment.transfer_journal()),
                params.owner,
                params.period.selector(),
                params.period_cost,
            )?;
            print_config(&engine);
        }
        Command::Serve { rpc_port } => {
            let mut engine = open_engine(&environment)?;
            engine.subscribe_events(Box::new(log_event));
            let port = rpc_port.unwrap_or(config.rpc_port);
            let addr: SocketAddr = format!("{}:{}", config.rpc_bind, port)
                .parse()
                .with_context(|| format!("invalid RPC address {}:{}", config.rpc_bind, port))?;
            tracing::info!(
                period = %engine.config().period,
                period_cost = %engine.period_cost(),
                data_dir = %config.data_dir.display(),
                "starting subledger"
            );
            RpcServer::new(addr, Arc::new(engine)).start().await?;
            tracing::info!("subledger exited cleanly");
        }
        Command::Info => {
            let engine = open_engine(&environment)?;
            print_config(&engine);
            let meta = environment.meta_store();
            println!("schema version: {}", meta.get_schema_version()?);
            println!(
                "accounts:       {}",
                environment.subscription_store().account_count()?
            );
            println!(
                "transfers:      {}",
                environment.transfer_journal().transfer_count()?
            );
            let report = check_integrity(&environment)?;
            if report.is_healthy() {
                println!(
                    "integrity:      ok ({} databases, {} entries)",
                    report.databases_checked, report.total_entries
                );
            } else {
                println!("integrity:      {} problem(s)", report.errors.len());
                for error in &report.errors {
                    println!("  - {error}");
                }
            }
        }
        Command::Status { account } => {
            let engine = open_engine(&environment)?;
            let now = engine.now();
            let record = engine.account(&account)?;
            let schedule = engine.schedule();
            println!("account:           {account}");
            println!("status:            {}", schedule.status(&record, now).as_str());
            println!("staked:            {}", record.staked_amount);
            println!("deposited at:      {}", record.deposit_timestamp.as_secs());
            println!("available balance: {}", schedule.available_balance(&record, now));
            println!("consumed:          {}", schedule.consumed_amount(&record, now));
            match schedule.active_until(&record) {
                Some(until) if schedule.is_active(&record, now) => println!(
                    "active until:      {} (in {})",
                    until.as_secs(),
                    format_duration(now.elapsed_since(until))
                ),
                Some(until) => println!("expired at:        {}", until.as_secs()),
                None => {}
            }
        }
        Command::Subscribe { account, value } => {
            let engine = open_engine(&environment)?;
            let record = engine.create_subscription(&account, value)?;
            println!(
                "subscribed {account}: staked {} at {}",
                record.staked_amount,
                record.deposit_timestamp.as_secs()
            );
        }
        Command::Increase { account, value } => {
            let engine = open_engine(&environment)?;
            let record = engine.increase_subscription(&account, value)?;
            println!("increased {account}: staked {}", record.staked_amount);
        }
        Command::Withdraw { account } => {
            let engine = open_engine(&environment)?;
            let amount = engine.withdraw_all(&account)?;
            println!("withdrew {amount} to {account}");
        }
        Command::Journal { after, limit } => {
            let journal = environment.transfer_journal();
            for transfer in journal.transfers_after(after, limit)? {
                println!(
                    "{:>8}  {:<3}  {:>12}  {}  {}",
                    transfer.seq,
                    format!("{:?}", transfer.direction),
                    transfer.at.as_secs(),
                    transfer.account,
                    transfer.amount
                );
            }
        }
    }

    Ok(())
}

fn open_engine(environment: &LmdbEnvironment) -> anyhow::Result<SubscriptionEngine> {
    let store: Arc<dyn SubscriptionStore> = Arc::new(environment.subscription_store());
    SubscriptionEngine::open(
        store,
        Arc::new(SystemClock),
        Arc::new(environment.transfer_journal()),
    )
    .context("ledger is not initialised; run `subledger init` first")
}

fn print_config(engine: &SubscriptionEngine) {
    let config = engine.config();
    println!("owner:          {}", config.owner);
    println!(
        "period:         {} ({}, selector {})",
        config.period,
        format_duration(config.period_secs()),
        config.period.selector()
    );
    println!("period cost:    {}", config.period_cost);
}

fn log_event(event: &SubscriptionEvent) {
    match serde_json::to_string(event) {
        Ok(json) => tracing::debug!(target: "subledger::events", %json, "ledger event"),
        Err(e) => tracing::warn!(error = %e, "failed to serialise ledger event"),
    }
}
