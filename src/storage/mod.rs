pub mod cache;
pub mod registry;

pub use cache::{cache_key, clamp_ttl, ArticleCache, CacheEntry, TTL_FLOOR_SECONDS};
pub use registry::FeedRegistry;
