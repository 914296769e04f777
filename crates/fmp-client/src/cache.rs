//! In-process response cache with a fixed TTL.
//!
//! Keys are endpoint plus sorted query params, so concurrent fetches for
//! the same endpoint+params land on the same entry. Expired entries are
//! evicted lazily on read.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

/// Responses stay fresh for one hour
pub const CACHE_TTL_SECS: i64 = 3600;

struct CacheEntry {
    data: Value,
    cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.cached_at < Duration::seconds(CACHE_TTL_SECS)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stable cache key from endpoint and query params
    pub fn key(endpoint: &str, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        sorted.sort();
        format!("fmp:{endpoint}?{}", sorted.join("&"))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Utc::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(now) {
                tracing::debug!(key, "cache hit");
                return Some(entry.data.clone());
            }
        }
        // Drop the read guard before removing
        if self.entries.remove_if(key, |_, e| !e.is_fresh(now)).is_some() {
            tracing::debug!(key, "cache expired");
        }
        None
    }

    pub fn put(&self, key: String, data: Value) {
        self.entries.insert(
            key,
            CacheEntry {
                data,
                cached_at: Utc::now(),
            },
        );
    }

    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let total_entries = self.entries.len();
        let valid_entries = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_fresh(now))
            .count();
        CacheStats {
            total_entries,
            valid_entries,
            expired_entries: total_entries - valid_entries,
        }
    }

    #[cfg(test)]
    fn put_with_age(&self, key: String, data: Value, age_secs: i64) {
        self.entries.insert(
            key,
            CacheEntry {
                data,
                cached_at: Utc::now() - Duration::seconds(age_secs),
            },
        );
    }
}
