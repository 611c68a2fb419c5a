//! Persisted image URL cache
//!
//! All entries live under one key, `productImages`, as a JSON object mapping
//! identifier to `{ url, timestamp, method }`. Entries are never deleted;
//! they simply stop being served once older than the TTL.

use serde::{Deserialize, Serialize};
use shelfscope_core::Clock;
use shelfscope_storage::{KeyValueStore, get_json, set_json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const CACHE_STORAGE_KEY: &str = "productImages";

/// 24 hours
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCacheEntry {
    pub url: String,
    /// Epoch milliseconds when the entry was written
    pub timestamp: i64,
    pub method: String,
}

impl ImageCacheEntry {
    pub fn is_valid_at(&self, now_millis: i64, ttl: Duration) -> bool {
        let age = now_millis.saturating_sub(self.timestamp);
        age < i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

#[derive(Clone)]
pub struct ImageCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ImageCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Every stored entry, valid or not. Unreadable storage reads as empty.
    pub fn entries(&self) -> HashMap<String, ImageCacheEntry> {
        match get_json::<HashMap<String, ImageCacheEntry>>(self.store.as_ref(), CACHE_STORAGE_KEY) {
            Ok(read) => read.ok().unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read image cache");
                HashMap::new()
            }
        }
    }

    /// Cached URL for `id` if the entry is younger than the TTL
    pub fn get_valid(&self, id: &str) -> Option<ImageCacheEntry> {
        let now = self.clock.now_millis();
        self.entries()
            .remove(id)
            .filter(|entry| entry.is_valid_at(now, self.ttl))
    }

    /// Split identifiers into cached-valid URLs and identifiers that need a fetch
    pub fn partition(&self, ids: &[String]) -> (HashMap<String, String>, Vec<String>) {
        let now = self.clock.now_millis();
        let entries = self.entries();

        let mut cached = HashMap::new();
        let mut missing = Vec::new();
        for id in ids {
            match entries.get(id) {
                Some(entry) if entry.is_valid_at(now, self.ttl) => {
                    cached.insert(id.clone(), entry.url.clone());
                }
                _ => missing.push(id.clone()),
            }
        }
        (cached, missing)
    }

    pub fn put(&self, id: &str, url: &str, method: &str) {
        self.put_many([(id.to_string(), url.to_string())], method);
    }

    /// Write entries with a fresh timestamp.
    ///
    /// Read-modify-write over the shared map; concurrent writers race and the
    /// last write wins. Failures are logged, never raised.
    pub fn put_many(&self, urls: impl IntoIterator<Item = (String, String)>, method: &str) {
        let now = self.clock.now_millis();
        let mut entries = self.entries();
        let mut written = 0usize;
        for (id, url) in urls {
            entries.insert(
                id,
                ImageCacheEntry {
                    url,
                    timestamp: now,
                    method: method.to_string(),
                },
            );
            written += 1;
        }
        if written == 0 {
            return;
        }
        if let Err(err) = set_json(self.store.as_ref(), CACHE_STORAGE_KEY, &entries) {
            tracing::warn!(error = %err, "Failed to persist image cache");
        }
    }
}
