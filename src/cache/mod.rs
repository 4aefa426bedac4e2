//! Generic stale-while-revalidate caching layer.
//!
//! This module provides a transport-agnostic caching mechanism that:
//! - Serves a persisted value immediately when one exists
//! - Refreshes stale values in the background without blocking the caller
//! - Awaits the fetch only when nothing usable is stored
//! - Treats every store write as best-effort

mod clock;
mod layer;
mod storage;
mod traits;

pub use layer::{RefreshHandle, StaleWhileRevalidateCache};
pub use storage::{CacheStorage, NoopStorage, SqliteStorage, StoredEntryInfo};
#[cfg(test)]
pub use storage::MemoryStorage;
pub use traits::{CacheEntry, CacheKey, CacheResult, CacheSource, Freshness};
