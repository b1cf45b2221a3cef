use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use crate::feed::NewsArticle;

/// TTLs below this are clamped up, never rejected.
pub const TTL_FLOOR_SECONDS: u64 = 300;

pub fn clamp_ttl(ttl_seconds: u64) -> u64 {
    ttl_seconds.max(TTL_FLOOR_SECONDS)
}

/// Derives the cache key for a feed URL. Keys are hashes of the trimmed
/// url rather than the raw string, leaving room for key normalization
/// without touching callers.
pub fn cache_key(feed_url: &str) -> String {
    blake3::hash(feed_url.trim().as_bytes()).to_hex().to_string()
}

/// One feed's most recent deduplicated article set.
///
/// `expires_at = cached_at + ttl`; the entry is stale iff `now >
/// expires_at`. Entries are replaced wholesale on refresh, never
/// partially updated.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub articles: Vec<NewsArticle>,
    pub cached_at: i64,
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Per-feed TTL-bounded article store.
///
/// Staleness is evaluated lazily at read time; nothing is proactively
/// evicted. To callers an expired entry and a missing one are
/// indistinguishable.
#[derive(Debug, Default)]
pub struct ArticleCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ArticleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<NewsArticle>> {
        self.get_at(key, Utc::now().timestamp())
    }

    pub(crate) fn get_at(&self, key: &str, now: i64) -> Option<Vec<NewsArticle>> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => Some(entry.articles.clone()),
            Some(_) => {
                debug!(key, "cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Stores a fresh entry, stamping `cached_at` on the entry and every
    /// article, and unconditionally replacing any prior entry.
    pub fn put(&self, key: String, articles: Vec<NewsArticle>, ttl_seconds: u64) {
        self.put_at(key, articles, ttl_seconds, Utc::now().timestamp())
    }

    pub(crate) fn put_at(
        &self,
        key: String,
        mut articles: Vec<NewsArticle>,
        ttl_seconds: u64,
        now: i64,
    ) {
        let ttl = clamp_ttl(ttl_seconds) as i64;
        for article in &mut articles {
            article.cached_at = now;
        }
        let entry = CacheEntry {
            articles,
            cached_at: now,
            expires_at: now + ttl,
        };
        self.entries.write().insert(key, entry);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
