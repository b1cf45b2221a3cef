pub mod dates;
pub mod dedup;
pub mod detect;
pub mod fetcher;
pub mod parser;
pub mod sanitize;

pub use detect::FeedType;

use serde::{Deserialize, Serialize};

/// One configured RSS/Atom source and its health state.
///
/// Timestamps are epoch seconds; 0 means "never". `last_error` is empty
/// while the feed is healthy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub url: String,
    pub title: String,
    pub description: String,
    pub last_error: String,
    pub last_updated: i64,
    pub last_fetch_attempt: i64,
    pub is_active: bool,
}

impl Feed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            description: String::new(),
            last_error: String::new(),
            last_updated: 0,
            last_fetch_attempt: 0,
            is_active: true,
        }
    }

    /// Source label for articles: the feed title once known, the url before.
    pub fn display_source(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

/// One normalized story.
///
/// `id` is content-addressed from the normalized title and link, so
/// re-fetching an unchanged article reproduces the same id.
/// `published_date` of 0 means the feed carried no parsable date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub source: String,
    pub author: String,
    pub category: String,
    pub published_date: i64,
    pub cached_at: i64,
}

/// Result of one successful parse: the document's own metadata plus the
/// extracted article list. The engine uses the metadata to refresh the
/// owning [`Feed`]'s title and description.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    pub articles: Vec<NewsArticle>,
}
