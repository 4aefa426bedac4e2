//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::layer::RefreshHandle;

/// Trait for values that identify a cached dataset.
///
/// The hash must be unique per logical data source within a store.
pub trait CacheKey {
  /// Stable storage key.
  fn cache_hash(&self) -> String;

  /// Human readable description for logs and `cache status`.
  fn description(&self) -> String;
}

impl CacheKey for str {
  fn cache_hash(&self) -> String {
    self.to_string()
  }

  fn description(&self) -> String {
    self.to_string()
  }
}

impl CacheKey for String {
  fn cache_hash(&self) -> String {
    self.clone()
  }

  fn description(&self) -> String {
    self.clone()
  }
}

/// A persisted value together with the instant it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub value: T,
  pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
  pub fn new(value: T, stored_at: DateTime<Utc>) -> Self {
    Self { value, stored_at }
  }
}

/// How an entry's age compares to the cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  /// Within the ttl (inclusive)
  Fresh,
  /// Older than the ttl, still servable
  Stale,
  /// Older than the hard max age, handled as a miss
  Expired,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the served data was stored (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
  /// Background refresh started (or joined) by a stale hit
  pub refresh: Option<RefreshHandle>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
      refresh: None,
    }
  }

  /// Create a new cache result for a fresh cache hit.
  pub fn fresh(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
      refresh: None,
    }
  }

  /// Create a new cache result for a stale hit with its pending refresh.
  pub fn stale(data: T, cached_at: DateTime<Utc>, refresh: RefreshHandle) -> Self {
    Self {
      data,
      source: CacheSource::CacheStale,
      cached_at: Some(cached_at),
      refresh: Some(refresh),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the network on a miss
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Data from cache, stale; a background refresh was started
  CacheStale,
}

impl CacheSource {
  pub fn label(&self) -> &'static str {
    match self {
      CacheSource::Network => "network",
      CacheSource::CacheFresh => "cache",
      CacheSource::CacheStale => "cache (stale, refreshing)",
    }
  }
}
