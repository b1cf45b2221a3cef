use std::cmp::Ordering;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::feed::dedup;
use crate::feed::detect::detect_feed_type;
use crate::feed::fetcher::{validate_feed_url, FeedFetcher};
use crate::feed::parser::FeedParser;
use crate::feed::{Feed, NewsArticle, ParsedFeed};
use crate::storage::cache::{cache_key, clamp_ttl, ArticleCache};
use crate::storage::registry::FeedRegistry;

/// Settings that stay mutable while the engine runs.
#[derive(Debug, Clone, Copy)]
struct Tunables {
    ttl_seconds: u64,
    max_articles_per_feed: usize,
}

/// Orchestrates registry, fetch, parse, dedup, and cache into the
/// externally consumed snapshot.
///
/// The feed list and the cache are guarded independently; network
/// fetches run with neither lock held, so a hanging source never stalls
/// reads of other feeds' cached data. One feed's failure is recorded on
/// that feed and the cycle continues.
pub struct AggregationEngine {
    registry: FeedRegistry,
    cache: ArticleCache,
    fetcher: FeedFetcher,
    parser: FeedParser,
    tunables: RwLock<Tunables>,
}

/// Service status snapshot for the host shell.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub feed_count: usize,
    pub active_feed_count: usize,
    pub cache_ttl_seconds: u64,
    pub max_articles_per_feed: usize,
    pub feeds: Vec<FeedHealth>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedHealth {
    pub url: String,
    pub is_active: bool,
    pub last_error: String,
    pub last_updated: i64,
}

impl AggregationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let fetcher = FeedFetcher::with_timeout_secs(config.fetch.timeout_secs)
            .with_user_agent(config.fetch.user_agent.clone());

        let engine = Self {
            registry: FeedRegistry::new(),
            cache: ArticleCache::new(),
            fetcher,
            parser: FeedParser::new(),
            tunables: RwLock::new(Tunables {
                ttl_seconds: clamp_ttl(config.cache_ttl_seconds),
                max_articles_per_feed: config.max_articles_per_feed.max(1),
            }),
        };

        for url in &config.feeds {
            if let Err(e) = validate_feed_url(url) {
                warn!(url = %url, error = %e, "skipping configured feed");
                continue;
            }
            engine.registry.add(url);
        }

        engine
    }

    /// Registers a feed. `Ok(false)` means the url was already present.
    pub fn add_feed(&self, url: &str) -> Result<bool> {
        validate_feed_url(url)?;
        Ok(self.registry.add(url))
    }

    /// Drops a feed and purges its cache entry. Returns false when the
    /// url was unknown (the purge still runs, covering entries orphaned
    /// by an in-flight fetch racing an earlier removal).
    pub fn remove_feed(&self, url: &str) -> bool {
        let removed = self.registry.remove(url);
        self.cache.remove(&cache_key(url));
        removed
    }

    pub fn set_feed_active(&self, url: &str, active: bool) -> bool {
        self.registry.set_active(url, active)
    }

    pub fn list_feeds(&self) -> Vec<Feed> {
        self.registry.list()
    }

    pub fn feeds_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.registry.list())?)
    }

    /// Updates the configured TTL, clamped to the cache floor. Entries
    /// already stored keep their original expiry.
    pub fn set_cache_ttl(&self, seconds: u64) {
        self.tunables.write().ttl_seconds = clamp_ttl(seconds);
    }

    pub fn cache_ttl(&self) -> u64 {
        self.tunables.read().ttl_seconds
    }

    pub fn set_max_articles_per_feed(&self, max: usize) {
        self.tunables.write().max_articles_per_feed = max.max(1);
    }

    pub fn max_articles_per_feed(&self) -> usize {
        self.tunables.read().max_articles_per_feed
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// The merged snapshot across all active feeds.
    ///
    /// Per feed: a non-expired cache entry is served as-is unless
    /// `force_refresh`; otherwise the feed goes through
    /// fetch → detect → parse → dedup → trim and the result replaces
    /// the cache entry. Feeds are merged in registration order, deduped
    /// across feeds (first occurrence wins), and sorted most recent
    /// first with unknown dates last.
    pub async fn latest_news(&self, force_refresh: bool) -> Vec<NewsArticle> {
        let feeds = self.registry.list();
        let mut merged = Vec::new();

        for feed in feeds.iter().filter(|f| f.is_active) {
            let key = cache_key(&feed.url);

            let cached = if force_refresh {
                None
            } else {
                self.cache.get(&key)
            };

            let articles = match cached {
                Some(articles) => articles,
                None => match self.refresh_feed(feed).await {
                    Ok(articles) => articles,
                    // last good set, when one is still unexpired
                    Err(_) => self.cache.get(&key).unwrap_or_default(),
                },
            };

            merged.extend(articles);
        }

        let mut merged = dedup::dedupe(merged);
        sort_by_recency(&mut merged);
        merged
    }

    pub async fn latest_news_json(&self, force_refresh: bool) -> Result<String> {
        Ok(serde_json::to_string(&self.latest_news(force_refresh).await)?)
    }

    /// Unconditionally re-runs the fetch cycle for every active feed,
    /// sequentially, and returns how many completed without error.
    /// Inactive feeds are skipped entirely.
    pub async fn refresh_all_feeds(&self) -> usize {
        let feeds = self.registry.list();
        let mut refreshed = 0;

        for feed in feeds.iter().filter(|f| f.is_active) {
            match self.refresh_feed(feed).await {
                Ok(articles) => {
                    debug!(url = %feed.url, count = articles.len(), "feed refreshed");
                    refreshed += 1;
                }
                Err(e) => {
                    warn!(url = %feed.url, error = %e, "feed refresh failed");
                }
            }
        }

        refreshed
    }

    pub fn status(&self) -> EngineStatus {
        let feeds = self.registry.list();
        let tunables = *self.tunables.read();

        EngineStatus {
            feed_count: feeds.len(),
            active_feed_count: feeds.iter().filter(|f| f.is_active).count(),
            cache_ttl_seconds: tunables.ttl_seconds,
            max_articles_per_feed: tunables.max_articles_per_feed,
            feeds: feeds
                .into_iter()
                .map(|f| FeedHealth {
                    url: f.url,
                    is_active: f.is_active,
                    last_error: f.last_error,
                    last_updated: f.last_updated,
                })
                .collect(),
        }
    }

    pub fn status_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.status())?)
    }

    /// One feed's full fetch cycle. Health is recorded on the registry
    /// entry either way; the cache entry is replaced only on success.
    async fn refresh_feed(&self, feed: &Feed) -> Result<Vec<NewsArticle>> {
        self.registry
            .record_attempt(&feed.url, Utc::now().timestamp());

        // no lock is held across this await
        match self.fetch_and_parse(feed).await {
            Ok(parsed) => {
                let now = Utc::now().timestamp();
                self.registry
                    .record_success(&feed.url, &parsed.title, &parsed.description, now);

                let tunables = *self.tunables.read();
                let mut articles = dedup::dedupe(parsed.articles);
                trim_to_most_recent(&mut articles, tunables.max_articles_per_feed);
                for article in &mut articles {
                    article.cached_at = now;
                }

                self.cache.put_at(
                    cache_key(&feed.url),
                    articles.clone(),
                    tunables.ttl_seconds,
                    now,
                );
                Ok(articles)
            }
            Err(e) => {
                self.registry.record_failure(&feed.url, &e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_and_parse(&self, feed: &Feed) -> Result<ParsedFeed> {
        let response = self.fetcher.fetch(&feed.url).await?;
        let feed_type = detect_feed_type(&response.body);
        debug!(url = %feed.url, format = %feed_type, "detected feed format");
        self.parser.parse(feed_type, &response.body, feed)
    }
}

/// Most recent first; unknown dates (0) always sort last. The sort is
/// stable, so equal dates keep their merge order.
fn sort_by_recency(articles: &mut [NewsArticle]) {
    articles.sort_by(compare_recency);
}

fn compare_recency(a: &NewsArticle, b: &NewsArticle) -> Ordering {
    match (a.published_date, b.published_date) {
        (0, 0) => Ordering::Equal,
        (0, _) => Ordering::Greater,
        (_, 0) => Ordering::Less,
        (x, y) => y.cmp(&x),
    }
}

/// Keeps the `max` most recent articles, ties broken by original order.
fn trim_to_most_recent(articles: &mut Vec<NewsArticle>, max: usize) {
    sort_by_recency(articles);
    articles.truncate(max);
}
