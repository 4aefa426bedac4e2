//! Cache storage trait and its SQLite, in-memory and no-op implementations.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
#[cfg(test)]
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::CacheEntry;

/// Metadata about one persisted entry, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntryInfo {
  pub key: String,
  pub stored_at: DateTime<Utc>,
  pub size_bytes: usize,
}

/// Trait for cache storage backends.
///
/// One entry per key; a write replaces whatever was stored before.
pub trait CacheStorage: Send + Sync {
  /// Read the entry stored under `key`.
  fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>>;

  /// Store `entry` under `key`, replacing any previous entry.
  fn write<T: Serialize>(&self, key: &str, entry: &CacheEntry<T>) -> Result<()>;

  /// Remove one entry. Returns whether anything was removed.
  fn remove(&self, key: &str) -> Result<bool>;

  /// Remove every entry. Returns the number removed.
  fn clear(&self) -> Result<usize>;

  /// List stored entries ordered by key.
  fn list(&self) -> Result<Vec<StoredEntryInfo>>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn read<T: DeserializeOwned>(&self, _key: &str) -> Result<Option<CacheEntry<T>>> {
    Ok(None) // Always miss
  }

  fn write<T: Serialize>(&self, _key: &str, _entry: &CacheEntry<T>) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<bool> {
    Ok(false)
  }

  fn clear(&self) -> Result<usize> {
    Ok(0)
  }

  fn list(&self) -> Result<Vec<StoredEntryInfo>> {
    Ok(Vec::new())
  }
}

#[cfg(test)]
#[derive(Debug, Clone)]
struct StoredBlob {
  data: Vec<u8>,
  stored_at: DateTime<Utc>,
}

/// Process-local storage holding serialized entries in a map.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<BTreeMap<String, StoredBlob>>,
}

#[cfg(test)]
impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, StoredBlob>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

#[cfg(test)]
impl CacheStorage for MemoryStorage {
  fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
    let entries = self.lock()?;
    match entries.get(key) {
      Some(blob) => {
        let value: T = serde_json::from_slice(&blob.data)
          .map_err(|e| eyre!("Failed to deserialize cache entry {}: {}", key, e))?;
        Ok(Some(CacheEntry::new(value, blob.stored_at)))
      }
      None => Ok(None),
    }
  }

  fn write<T: Serialize>(&self, key: &str, entry: &CacheEntry<T>) -> Result<()> {
    let data = serde_json::to_vec(&entry.value)
      .map_err(|e| eyre!("Failed to serialize cache entry {}: {}", key, e))?;
    self.lock()?.insert(
      key.to_string(),
      StoredBlob {
        data,
        stored_at: entry.stored_at,
      },
    );
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<bool> {
    Ok(self.lock()?.remove(key).is_some())
  }

  fn clear(&self) -> Result<usize> {
    let mut entries = self.lock()?;
    let count = entries.len();
    entries.clear();
    Ok(count)
  }

  fn list(&self) -> Result<Vec<StoredEntryInfo>> {
    Ok(
      self
        .lock()?
        .iter()
        .map(|(key, blob)| StoredEntryInfo {
          key: key.clone(),
          stored_at: blob.stored_at,
          size_bytes: blob.data.len(),
        })
        .collect(),
    )
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("bankview").join("cache.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .lock()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One serialized value per key
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    stored_at TEXT NOT NULL
);
"#;

impl CacheStorage for SqliteStorage {
  fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
    let conn = self.lock()?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, stored_at FROM cache_entries WHERE key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

    match row {
      Some((data, stored_at_str)) => {
        let value: T = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize cache entry {}: {}", key, e))?;
        let stored_at = parse_datetime(&stored_at_str)?;
        Ok(Some(CacheEntry::new(value, stored_at)))
      }
      None => Ok(None),
    }
  }

  fn write<T: Serialize>(&self, key: &str, entry: &CacheEntry<T>) -> Result<()> {
    let data = serde_json::to_vec(&entry.value)
      .map_err(|e| eyre!("Failed to serialize cache entry {}: {}", key, e))?;

    self
      .lock()?
      .execute(
        "INSERT OR REPLACE INTO cache_entries (key, data, stored_at) VALUES (?, ?, ?)",
        params![key, data, entry.stored_at.to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<bool> {
    let removed = self
      .lock()?
      .execute("DELETE FROM cache_entries WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove cache entry {}: {}", key, e))?;
    Ok(removed > 0)
  }

  fn clear(&self) -> Result<usize> {
    self
      .lock()?
      .execute("DELETE FROM cache_entries", [])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))
  }

  fn list(&self) -> Result<Vec<StoredEntryInfo>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT key, stored_at, length(data) FROM cache_entries ORDER BY key")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows: Vec<(String, String, i64)> = stmt
      .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
      .map_err(|e| eyre!("Failed to list cache entries: {}", e))?
      .collect::<rusqlite::Result<_>>()
      .map_err(|e| eyre!("Failed to list cache entries: {}", e))?;

    rows
      .into_iter()
      .map(|(key, stored_at, size)| {
        Ok(StoredEntryInfo {
          key,
          stored_at: parse_datetime(&stored_at)?,
          size_bytes: usize::try_from(size).unwrap_or(0),
        })
      })
      .collect()
  }
}

/// Parse a stored RFC 3339 timestamp.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
