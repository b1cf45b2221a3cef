use parking_lot::RwLock;
use tracing::debug;

use crate::feed::Feed;

/// The authoritative, mutable list of configured feeds.
///
/// Insertion order is preserved: listing and cross-feed merge both run
/// in registration order. All reads return snapshot copies, so callers
/// never observe the registry mid-mutation.
#[derive(Debug, Default)]
pub struct FeedRegistry {
    feeds: RwLock<Vec<Feed>>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new feed. Returns false without mutating anything when
    /// the url is already registered.
    pub fn add(&self, url: &str) -> bool {
        let mut feeds = self.feeds.write();
        if feeds.iter().any(|f| f.url == url) {
            debug!(url, "feed already registered");
            return false;
        }
        feeds.push(Feed::new(url));
        true
    }

    /// Erases a feed. Returns false when the url is unknown.
    pub fn remove(&self, url: &str) -> bool {
        let mut feeds = self.feeds.write();
        let before = feeds.len();
        feeds.retain(|f| f.url != url);
        feeds.len() < before
    }

    /// Snapshot of all feeds in insertion order.
    pub fn list(&self) -> Vec<Feed> {
        self.feeds.read().clone()
    }

    pub fn get(&self, url: &str) -> Option<Feed> {
        self.feeds.read().iter().find(|f| f.url == url).cloned()
    }

    pub fn len(&self) -> usize {
        self.feeds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.read().is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.feeds.read().iter().filter(|f| f.is_active).count()
    }

    /// Soft-disable flag, changed only by explicit caller request.
    pub fn set_active(&self, url: &str, active: bool) -> bool {
        let mut feeds = self.feeds.write();
        match feeds.iter_mut().find(|f| f.url == url) {
            Some(feed) => {
                feed.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Stamps a fetch attempt, success or not.
    pub fn record_attempt(&self, url: &str, now: i64) {
        let mut feeds = self.feeds.write();
        if let Some(feed) = feeds.iter_mut().find(|f| f.url == url) {
            feed.last_fetch_attempt = now;
        }
    }

    /// Stamps a successful parse: refreshes the feed's own metadata and
    /// clears any previous error.
    pub fn record_success(&self, url: &str, title: &str, description: &str, now: i64) {
        let mut feeds = self.feeds.write();
        if let Some(feed) = feeds.iter_mut().find(|f| f.url == url) {
            feed.last_updated = now;
            feed.last_error.clear();
            if !title.is_empty() {
                feed.title = title.to_string();
            }
            if !description.is_empty() {
                feed.description = description.to_string();
            }
        }
    }

    /// Records a failed cycle. The feed stays active: transient failures
    /// never self-disable a source.
    pub fn record_failure(&self, url: &str, error: &str) {
        let mut feeds = self.feeds.write();
        if let Some(feed) = feeds.iter_mut().find(|f| f.url == url) {
            feed.last_error = error.to_string();
        }
    }
}
