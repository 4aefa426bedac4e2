//! Command handlers and their terminal output.

use chrono::Utc;
use color_eyre::Result;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::cached_client::CachedBankClient;
use crate::api::types::{
  Account, MacroIndicator, MarketAnalysisRequest, OpenFinanceAccount, Transaction,
};
use crate::cache::{CacheResult, CacheStorage, Freshness, StoredEntryInfo};
use crate::format::{
  balance_badge, change_badge, format_age, format_currency, format_date, truncate, Badge,
};

/// How long `indicators` waits for a background refresh before exiting
const REFRESH_WAIT: Duration = Duration::from_secs(15);

pub async fn indicators<S: CacheStorage + 'static>(
  client: &CachedBankClient<S>,
  region: Option<&str>,
  wait_for_refresh: bool,
) -> Result<()> {
  let result = client.macro_indicators(region).await?;

  println!("{}", source_line(&result));
  for indicator in &result.data {
    println!("{}", indicator_line(indicator));
  }

  if let Some(refresh) = result.refresh {
    if !wait_for_refresh {
      return Ok(());
    }
    // The process exits after this command; give the refresh a chance to persist
    match tokio::time::timeout(REFRESH_WAIT, refresh.finished()).await {
      Ok(true) => info!("Indicators refreshed in background"),
      Ok(false) => info!("Background refresh did not update the cache"),
      Err(_) => warn!("Gave up waiting for background refresh"),
    }
  }

  Ok(())
}

pub async fn accounts<S: CacheStorage + 'static>(
  client: &CachedBankClient<S>,
  low_balance: f64,
) -> Result<()> {
  let accounts = client.list_accounts().await?;
  if accounts.is_empty() {
    println!("No accounts");
  }
  for account in &accounts {
    println!("{}", account_line(account, low_balance));
  }
  Ok(())
}

pub async fn transactions<S: CacheStorage + 'static>(
  client: &CachedBankClient<S>,
  account_id: &str,
  limit: usize,
) -> Result<()> {
  let account = client.get_account(account_id).await?;
  let transactions = client.list_transactions(account_id, limit).await?;

  println!(
    "{} ({}) balance {}",
    account.name,
    account.id,
    format_currency(account.balance, &account.currency)
  );
  if transactions.is_empty() {
    println!("  No transactions");
  }
  for transaction in &transactions {
    println!("{}", transaction_line(transaction));
  }
  Ok(())
}

pub async fn open_finance<S: CacheStorage + 'static>(
  client: &CachedBankClient<S>,
  user: &str,
) -> Result<()> {
  let accounts = client.open_finance_accounts(user).await?;
  for account in &accounts {
    println!("{}", open_finance_line(account));
  }
  Ok(())
}

pub async fn analyze<S: CacheStorage + 'static>(
  client: &CachedBankClient<S>,
  symbols: Vec<String>,
  question: Option<String>,
) -> Result<()> {
  let request = MarketAnalysisRequest {
    symbols: symbols.iter().map(|s| s.trim().to_uppercase()).collect(),
    question,
  };
  let analysis = client.analyze_market(&request).await?;

  println!("{}", analysis.summary);
  for sentiment in &analysis.sentiment {
    println!(
      "  {} {:<8} {:+.2}",
      sentiment_badge(sentiment.score).label(),
      sentiment.symbol,
      sentiment.score
    );
  }
  if let Some(recommendation) = &analysis.recommendation {
    println!("Recommendation: {}", recommendation);
  }
  Ok(())
}

pub async fn ask<S: CacheStorage + 'static>(
  client: &CachedBankClient<S>,
  question: &str,
) -> Result<()> {
  let answer = client.ask_chatbot(question).await?;
  println!("{}", answer.answer);
  if !answer.sources.is_empty() {
    println!();
    println!("Sources:");
    for source in &answer.sources {
      println!("  - {}", source);
    }
  }
  Ok(())
}

pub fn cache_status<S: CacheStorage + 'static>(client: &CachedBankClient<S>) -> Result<()> {
  let entries = client.cache_entries()?;
  let ttl_hours = client.cache().ttl().num_minutes() as f64 / 60.0;
  println!("{} cached entries (ttl {:.1}h)", entries.len(), ttl_hours);
  for entry in &entries {
    let freshness = client.cache().freshness(entry.stored_at);
    println!("{}", cache_entry_line(entry, freshness));
  }
  Ok(())
}

pub fn cache_clear<S: CacheStorage + 'static>(
  client: &CachedBankClient<S>,
  key: Option<&str>,
) -> Result<()> {
  let removed = client.clear_cache(key)?;
  info!(removed, "Cache cleared");
  println!("Removed {} cache entries", removed);
  Ok(())
}

fn source_line<T>(result: &CacheResult<T>) -> String {
  match result.cached_at {
    Some(at) => format!(
      "Macro indicators [{}, stored {}]",
      result.source.label(),
      format_age(at, Utc::now())
    ),
    None => format!("Macro indicators [{}]", result.source.label()),
  }
}

fn indicator_line(indicator: &MacroIndicator) -> String {
  let badge = indicator.change_pct.map(change_badge).unwrap_or(Badge::Neutral);
  let value = match &indicator.unit {
    Some(unit) => format!("{:.2} {}", indicator.value, unit),
    None => format!("{:.2}", indicator.value),
  };
  let change = indicator
    .change_pct
    .map(|c| format!("{:+.2}%", c))
    .unwrap_or_default();

  format!(
    "  {} {:<28} {:>18} {:>8}",
    badge.label(),
    truncate(&indicator.name, 28),
    value,
    change
  )
  .trim_end()
  .to_string()
}

fn account_line(account: &Account, low_balance: f64) -> String {
  format!(
    "  {} {:<12} {:<24} {:<10} {:>16}",
    balance_badge(account.balance, low_balance).label(),
    truncate(&account.id, 12),
    truncate(&account.name, 24),
    account.account_type,
    format_currency(account.balance, &account.currency)
  )
}

fn transaction_line(transaction: &Transaction) -> String {
  format!(
    "  {:<13} {:<32} {:<14} {:>14}",
    format_date(&transaction.date),
    truncate(&transaction.description, 32),
    truncate(transaction.category.as_deref().unwrap_or("-"), 14),
    format_currency(transaction.amount, &transaction.currency)
  )
}

fn open_finance_line(account: &OpenFinanceAccount) -> String {
  format!(
    "  {:<20} {:<24} {:>16}",
    truncate(&account.institution, 20),
    truncate(&account.name, 24),
    format_currency(account.balance, &account.currency)
  )
}

/// Sentiment scores live in [-1, 1]
fn sentiment_badge(score: f64) -> Badge {
  if score >= 0.2 {
    Badge::Positive
  } else if score <= -0.2 {
    Badge::Negative
  } else {
    Badge::Neutral
  }
}

fn cache_entry_line(entry: &StoredEntryInfo, freshness: Freshness) -> String {
  let state = match freshness {
    Freshness::Fresh => "fresh",
    Freshness::Stale => "stale",
    Freshness::Expired => "expired",
  };
  format!(
    "  {:<64} {:<8} {:>10} {:>8} B",
    entry.key,
    state,
    format_age(entry.stored_at, Utc::now()),
    entry.size_bytes
  )
}
