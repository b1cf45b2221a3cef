pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod storage;
pub mod widget;

pub use config::EngineConfig;
pub use engine::{AggregationEngine, EngineStatus, FeedHealth};
pub use error::{Error, Result};
pub use feed::{Feed, FeedType, NewsArticle};
pub use widget::{NewsWidget, Widget, WidgetFactory};
