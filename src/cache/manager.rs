//! Cache manager for normalized book result sets
//!
//! Provides a `CacheManager` that stores result sets with the time they were
//! written and enforces a freshness window on every read.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::data::Books;

/// Errors that make the cache unusable
///
/// Unlike provider failures these are propagated to callers: they indicate a
/// defect in the process rather than bad upstream data.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A thread panicked while holding the cache lock
    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Deterministic cache key built from an operation or provider name, the
/// query text and the result limit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key for a parameterised lookup
    ///
    /// The query is trimmed and lowercased so that equivalent queries share
    /// an entry.
    pub fn new(scope: &str, query: &str, limit: usize) -> Self {
        Self(format!(
            "{}:{}:{}",
            scope,
            query.trim().to_lowercase(),
            limit
        ))
    }

    /// Builds a key for a fixed, parameterless operation (e.g. "trending")
    pub fn named(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored result set
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The cached books
    data: Books,
    /// When the data was cached
    stored_at: DateTime<Utc>,
}

/// Manages the shared in-memory result cache
///
/// Cloning a `CacheManager` yields another handle to the same store. Entries
/// are replaced wholesale on write ("last write wins") and are handed out as
/// shared immutable snapshots.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Stored entries, keyed by cache key
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    /// How long an entry is considered fresh
    ttl: Duration,
}

impl CacheManager {
    /// Creates an empty cache whose entries stay fresh for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Reads a fresh entry from the cache
    ///
    /// Returns `Ok(None)` if the key is missing or the entry is older than the
    /// TTL. Expired entries are left in place until the next write or clear.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Books>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };

        if Utc::now() - entry.stored_at < self.ttl {
            Ok(Some(Arc::clone(&entry.data)))
        } else {
            Ok(None)
        }
    }

    /// Stores `data` under `key`, stamped with the current time
    pub fn put(&self, key: CacheKey, data: Books) -> Result<(), CacheError> {
        self.put_at(key, data, Utc::now())
    }

    /// Drops every entry regardless of age
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.clear();
        Ok(())
    }

    /// Number of stored entries, fresh or expired
    pub fn len(&self) -> Result<usize, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.len())
    }

    /// Whether the store holds no entries at all
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    fn put_at(
        &self,
        key: CacheKey,
        data: Books,
        stored_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key, CacheEntry { data, stored_at });
        Ok(())
    }
}
