use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::feed::fetcher::validate_feed_url;
use crate::storage::cache::clamp_ttl;

/// Sources registered when no explicit feed list is configured.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.reuters.com/reuters/topNews",
    "https://rss.cnn.com/rss/edition.rss",
];

/// Engine configuration. TTL and the per-feed article cap stay mutable
/// at runtime through the engine; this is the startup shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    #[serde(default = "default_max_articles")]
    pub max_articles_per_feed: usize,

    /// Initial feed URLs, registered at engine construction.
    #[serde(default = "default_feeds")]
    pub feeds: Vec<String>,

    #[serde(default)]
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|_| Error::Config(format!("cannot read {}", path.as_ref().display())))?;

        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for url in &self.feeds {
            validate_feed_url(url)?;
        }

        if self.max_articles_per_feed == 0 {
            return Err(Error::Config(
                "max_articles_per_feed must be greater than 0".to_string(),
            ));
        }

        if self.fetch.timeout_secs == 0 {
            return Err(Error::Config(
                "fetch timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The TTL actually applied to cache writes, floor included.
    pub fn effective_ttl(&self) -> u64 {
        clamp_ttl(self.cache_ttl_seconds)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(ttl) = std::env::var("NEWSWIRE_CACHE_TTL") {
            if let Ok(val) = ttl.parse() {
                self.cache_ttl_seconds = val;
            }
        }

        if let Ok(max) = std::env::var("NEWSWIRE_MAX_ARTICLES") {
            if let Ok(val) = max.parse() {
                self.max_articles_per_feed = val;
            }
        }

        if let Ok(timeout) = std::env::var("NEWSWIRE_HTTP_TIMEOUT") {
            if let Ok(val) = timeout.parse() {
                self.fetch.timeout_secs = val;
            }
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl(),
            max_articles_per_feed: default_max_articles(),
            feeds: default_feeds(),
            fetch: FetchSettings::default(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    1800
}

fn default_max_articles() -> usize {
    50
}

fn default_feeds() -> Vec<String> {
    DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect()
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("newswire/{}", env!("CARGO_PKG_VERSION"))
}
