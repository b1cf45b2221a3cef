use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::AggregationEngine;
use crate::error::Result;

/// Capability contract the host dashboard shell drives widgets through.
///
/// The shell keeps one value per registered identifier and constructs
/// them through a [`WidgetFactory`] keyed by that identifier; it never
/// sees concrete widget types.
#[async_trait]
pub trait Widget: Send + Sync {
    fn id(&self) -> &str;
    async fn start(&self) -> Result<()>;
    async fn stop(&self);
    /// JSON snapshot of the widget's current data.
    async fn get_data(&self) -> Result<String>;
    /// Applies a JSON configuration document.
    async fn set_config(&self, config: &str) -> Result<()>;
    fn is_active(&self) -> bool;
}

/// Constructor registered per widget identifier.
pub type WidgetFactory = Box<dyn Fn() -> Arc<dyn Widget> + Send + Sync>;

/// Config document accepted by [`NewsWidget::set_config`]. All fields
/// optional; listed feeds are added, never removed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WidgetConfig {
    cache_ttl_seconds: Option<u64>,
    max_articles_per_feed: Option<usize>,
    #[serde(default)]
    feeds: Vec<String>,
}

/// The news engine behind the widget contract.
pub struct NewsWidget {
    engine: Arc<AggregationEngine>,
    started: AtomicBool,
}

impl NewsWidget {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: Arc::new(AggregationEngine::new(config)),
            started: AtomicBool::new(false),
        }
    }

    pub fn factory(config: EngineConfig) -> WidgetFactory {
        Box::new(move || Arc::new(NewsWidget::new(config.clone())) as Arc<dyn Widget>)
    }

    /// Direct engine access for hosts that need more than the widget
    /// surface (feed management, status).
    pub fn engine(&self) -> &Arc<AggregationEngine> {
        &self.engine
    }
}

#[async_trait]
impl Widget for NewsWidget {
    fn id(&self) -> &str {
        "news"
    }

    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        self.engine.clear_cache();
    }

    async fn get_data(&self) -> Result<String> {
        if !self.is_active() {
            return Ok("[]".to_string());
        }
        self.engine.latest_news_json(false).await
    }

    async fn set_config(&self, config: &str) -> Result<()> {
        let config: WidgetConfig = serde_json::from_str(config)?;

        if let Some(ttl) = config.cache_ttl_seconds {
            self.engine.set_cache_ttl(ttl);
        }
        if let Some(max) = config.max_articles_per_feed {
            self.engine.set_max_articles_per_feed(max);
        }
        for url in &config.feeds {
            if self.engine.add_feed(url)? {
                debug!(url = %url, "feed added via widget config");
            }
        }

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> NewsWidget {
        NewsWidget::new(EngineConfig {
            feeds: Vec::new(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn start_and_stop_toggle_activity() {
        let widget = widget();
        assert!(!widget.is_active());

        widget.start().await.unwrap();
        assert!(widget.is_active());

        widget.stop().await;
        assert!(!widget.is_active());
    }

    #[tokio::test]
    async fn get_data_before_start_is_an_empty_listing() {
        let widget = widget();
        assert_eq!(widget.get_data().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn get_data_with_no_feeds_is_valid_json() {
        let widget = widget();
        widget.start().await.unwrap();

        let data = widget.get_data().await.unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&data).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn set_config_applies_ttl_cap_and_feeds() {
        let widget = widget();
        widget
            .set_config(
                r#"{"cacheTtlSeconds": 60, "maxArticlesPerFeed": 5,
                    "feeds": ["https://example.com/a.xml", "https://example.com/b.xml"]}"#,
            )
            .await
            .unwrap();

        // ttl passes through the 300-second floor
        assert_eq!(widget.engine().cache_ttl(), 300);
        assert_eq!(widget.engine().max_articles_per_feed(), 5);
        assert_eq!(widget.engine().list_feeds().len(), 2);
    }

    #[tokio::test]
    async fn set_config_tolerates_repeated_feeds() {
        let widget = widget();
        let config = r#"{"feeds": ["https://example.com/a.xml"]}"#;
        widget.set_config(config).await.unwrap();
        widget.set_config(config).await.unwrap();
        assert_eq!(widget.engine().list_feeds().len(), 1);
    }

    #[tokio::test]
    async fn set_config_rejects_invalid_documents() {
        let widget = widget();
        assert!(widget.set_config("not json").await.is_err());
        assert!(widget
            .set_config(r#"{"feeds": ["ftp://example.com/feed"]}"#)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn factory_builds_widgets_with_the_news_id() {
        let factory = NewsWidget::factory(EngineConfig {
            feeds: Vec::new(),
            ..Default::default()
        });
        let widget = factory();
        assert_eq!(widget.id(), "news");
        assert!(!widget.is_active());
    }
}
