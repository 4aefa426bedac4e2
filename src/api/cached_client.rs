//! Banking client that serves macro indicators through the stale-while-revalidate cache.

use color_eyre::{eyre::eyre, Result};

use crate::cache::{CacheResult, CacheStorage, StaleWhileRevalidateCache, StoredEntryInfo};

use super::bank::BankClient;
use super::cache::BankQueryKey;
use super::types::{
  Account, ChatAnswer, MacroIndicator, MarketAnalysis, MarketAnalysisRequest, OpenFinanceAccount,
  Transaction,
};

/// Banking client with transparent caching of indicator data.
///
/// Only the macro indicators are cached; account data must be current and
/// the remaining calls are actions.
pub struct CachedBankClient<S: CacheStorage> {
  inner: BankClient,
  cache: StaleWhileRevalidateCache<S>,
}

impl<S: CacheStorage + 'static> CachedBankClient<S> {
  pub fn new(inner: BankClient, cache: StaleWhileRevalidateCache<S>) -> Self {
    Self { inner, cache }
  }

  /// Get macro indicators; a stale result carries its pending refresh.
  pub async fn macro_indicators(
    &self,
    region: Option<&str>,
  ) -> Result<CacheResult<Vec<MacroIndicator>>> {
    let query_key = BankQueryKey::MacroIndicators {
      region: region.map(String::from),
    };

    self
      .cache
      .get(&query_key, || {
        let inner = self.inner.clone();
        let region = region.map(String::from);
        async move { inner.macro_indicators(region.as_deref()).await }
      })
      .await
  }

  /// List accounts (not cached).
  pub async fn list_accounts(&self) -> Result<Vec<Account>> {
    self.inner.list_accounts().await
  }

  /// Get one account (not cached).
  pub async fn get_account(&self, id: &str) -> Result<Account> {
    self.inner.get_account(id).await
  }

  /// List transactions (not cached).
  pub async fn list_transactions(&self, account_id: &str, limit: usize) -> Result<Vec<Transaction>> {
    self.inner.list_transactions(account_id, limit).await
  }

  /// Run market analysis (not cached - action).
  pub async fn analyze_market(&self, request: &MarketAnalysisRequest) -> Result<MarketAnalysis> {
    self.inner.analyze_market(request).await
  }

  /// Open-finance accounts (not cached - user scoped).
  pub async fn open_finance_accounts(&self, user: &str) -> Result<Vec<OpenFinanceAccount>> {
    self.inner.open_finance_accounts(user).await
  }

  /// Ask the chatbot (not cached).
  pub async fn ask_chatbot(&self, question: &str) -> Result<ChatAnswer> {
    self.inner.ask_chatbot(question).await
  }

  /// Entries currently persisted in the cache.
  pub fn cache_entries(&self) -> Result<Vec<StoredEntryInfo>> {
    self.cache.storage().list()
  }

  /// Remove the entry whose key starts with `key`, or all of them when `key`
  /// is `None`. An ambiguous prefix removes nothing.
  pub fn clear_cache(&self, key: Option<&str>) -> Result<usize> {
    let storage = self.cache.storage();
    let Some(prefix) = key.map(str::trim) else {
      return storage.clear();
    };
    if prefix.is_empty() {
      return Err(eyre!("Cache key must not be empty"));
    }

    let matches: Vec<String> = storage
      .list()?
      .into_iter()
      .map(|entry| entry.key)
      .filter(|k| k.starts_with(prefix))
      .collect();

    match matches.as_slice() {
      [] => Ok(0),
      [key] => Ok(usize::from(storage.remove(key)?)),
      _ => Err(eyre!(
        "Cache key prefix '{}' matches {} entries",
        prefix,
        matches.len()
      )),
    }
  }

  pub fn cache(&self) -> &StaleWhileRevalidateCache<S> {
    &self.cache
  }
}
