mod api;
mod cache;
mod commands;
mod config;
mod format;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

use api::bank::BankClient;
use api::cached_client::CachedBankClient;
use cache::{CacheStorage, NoopStorage, SqliteStorage, StaleWhileRevalidateCache};
use config::{CacheConfig, Config};

#[derive(Parser, Debug)]
#[command(name = "bankview")]
#[command(about = "Command-line client for the demo banking services")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/bankview/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log at debug level
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Macro indicators, served from the local cache when available
  Indicators {
    /// Region code (e.g. US, EU)
    #[arg(short, long)]
    region: Option<String>,

    /// Exit without waiting for a background refresh
    #[arg(long)]
    no_wait: bool,
  },
  /// List accounts
  Accounts {
    /// Balances below this are flagged
    #[arg(long, default_value_t = 100.0)]
    low_balance: f64,
  },
  /// Recent transactions of an account
  Transactions {
    account: String,

    #[arg(short, long, default_value_t = 20)]
    limit: usize,
  },
  /// Linked accounts of a demo open-finance user
  OpenFinance { user: String },
  /// Run the capital-markets agents on one or more symbols
  Analyze {
    #[arg(required = true)]
    symbols: Vec<String>,

    #[arg(short, long)]
    question: Option<String>,
  },
  /// Ask the document chatbot
  Ask {
    #[arg(required = true)]
    question: Vec<String>,
  },
  /// Inspect or clear the local cache
  Cache {
    #[command(subcommand)]
    action: CacheCommand,
  },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Show cached entries and their freshness
  Status,
  /// Remove one entry by key or unique key prefix, or everything when no key is given
  Clear { key: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = logging::init(&logging::default_log_dir()?, args.verbose)?;
  tracing::debug!(?args, "Starting bankview");

  let config = Config::load(args.config.as_deref())?;
  let bank = BankClient::new(&config)?;

  if config.cache.enabled {
    let storage = match &config.cache.path {
      Some(path) => SqliteStorage::open_at(path)?,
      None => SqliteStorage::open()?,
    };
    run(CachedBankClient::new(bank, build_cache(storage, &config.cache)?), args.command).await
  } else {
    run(CachedBankClient::new(bank, build_cache(NoopStorage, &config.cache)?), args.command).await
  }
}

fn build_cache<S: CacheStorage + 'static>(
  storage: S,
  config: &CacheConfig,
) -> Result<StaleWhileRevalidateCache<S>> {
  Ok(
    StaleWhileRevalidateCache::new(storage)
      .with_ttl(config.ttl()?)
      .with_refresh_coalescing(config.coalesce_refreshes)
      .with_max_age(config.max_age()?),
  )
}

async fn run<S: CacheStorage + 'static>(client: CachedBankClient<S>, command: Command) -> Result<()> {
  match command {
    Command::Indicators { region, no_wait } => {
      commands::indicators(&client, region.as_deref(), !no_wait).await
    }
    Command::Accounts { low_balance } => commands::accounts(&client, low_balance).await,
    Command::Transactions { account, limit } => {
      commands::transactions(&client, &account, limit).await
    }
    Command::OpenFinance { user } => commands::open_finance(&client, &user).await,
    Command::Analyze { symbols, question } => commands::analyze(&client, symbols, question).await,
    Command::Ask { question } => commands::ask(&client, &question.join(" ")).await,
    Command::Cache { action } => match action {
      CacheCommand::Status => commands::cache_status(&client),
      CacheCommand::Clear { key } => commands::cache_clear(&client, key.as_deref()),
    },
  }
}
