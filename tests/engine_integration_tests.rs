use newswire::engine::AggregationEngine;
use newswire::EngineConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use test_data::*;

/// End-to-end tests for the aggregation cycle: fetch, detect, parse,
/// dedup, cache, merge.

fn engine() -> AggregationEngine {
    init_tracing();
    AggregationEngine::new(EngineConfig {
        feeds: Vec::new(),
        ..Default::default()
    })
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

async fn mount_feed(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/xml"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn cold_cache_merges_dedups_and_sorts() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", FEED_A_RSS).await;
    mount_feed(&server, "/b.xml", FEED_B_ATOM).await;

    let engine = engine();
    engine.add_feed(&format!("{}/a.xml", server.uri())).unwrap();
    engine.add_feed(&format!("{}/b.xml", server.uri())).unwrap();

    let articles = engine.latest_news(false).await;

    // 3 + 2 articles with the shared story collapsed
    assert_eq!(articles.len(), 4);

    let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Shared Headline", "Alpha One", "Beta One", "Alpha Two"]);

    // sorted most recent first, unknown date last
    let dates: Vec<_> = articles.iter().map(|a| a.published_date).collect();
    assert_eq!(dates, vec![1710496800, 1710493200, 1710489600, 0]);

    // feed A registered first, so its copy of the duplicate won
    assert_eq!(articles[0].source, "Alpha Wire");

    // ids are stable and distinct
    let mut ids: Vec<_> = articles.iter().map(|a| a.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn fresh_cache_is_served_without_refetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_A_RSS))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine();
    engine.add_feed(&format!("{}/a.xml", server.uri())).unwrap();

    let first = engine.latest_news(false).await;
    let second = engine.latest_news(false).await;

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    // the expect(1) on the mock verifies the second call never hit the network
}

#[tokio::test]
async fn force_refresh_bypasses_a_valid_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_A_RSS))
        .expect(2)
        .mount(&server)
        .await;

    let engine = engine();
    engine.add_feed(&format!("{}/a.xml", server.uri())).unwrap();

    engine.latest_news(false).await;
    engine.latest_news(true).await;
}

#[tokio::test]
async fn transport_failure_is_recorded_and_other_feeds_continue() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", FEED_A_RSS).await;
    Mock::given(method("GET"))
        .and(path("/b.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = engine();
    let url_a = format!("{}/a.xml", server.uri());
    let url_b = format!("{}/b.xml", server.uri());
    engine.add_feed(&url_a).unwrap();
    engine.add_feed(&url_b).unwrap();

    let articles = engine.latest_news(false).await;
    assert_eq!(articles.len(), 3); // feed A only

    let feeds = engine.list_feeds();
    let feed_b = feeds.iter().find(|f| f.url == url_b).unwrap();
    assert!(feed_b.last_error.contains("404"));
    assert!(feed_b.is_active);
    assert!(feed_b.last_fetch_attempt > 0);
    assert_eq!(feed_b.last_updated, 0);
}

#[tokio::test]
async fn unknown_format_is_a_recorded_non_fatal_failure() {
    let server = MockServer::start().await;
    mount_feed(&server, "/page.html", NOT_A_FEED).await;

    let engine = engine();
    let url = format!("{}/page.html", server.uri());
    engine.add_feed(&url).unwrap();

    let articles = engine.latest_news(false).await;
    assert!(articles.is_empty());

    let feed = &engine.list_feeds()[0];
    assert!(!feed.last_error.is_empty());
    assert!(feed.is_active);
}

#[tokio::test]
async fn malformed_xml_is_a_recorded_hard_failure() {
    let server = MockServer::start().await;
    mount_feed(&server, "/broken.xml", MALFORMED_RSS).await;

    let engine = engine();
    engine
        .add_feed(&format!("{}/broken.xml", server.uri()))
        .unwrap();

    assert_eq!(engine.refresh_all_feeds().await, 0);
    assert!(!engine.list_feeds()[0].last_error.is_empty());
}

#[tokio::test]
async fn successful_fetch_refreshes_feed_metadata() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", FEED_A_RSS).await;

    let engine = engine();
    engine.add_feed(&format!("{}/a.xml", server.uri())).unwrap();
    engine.latest_news(false).await;

    let feed = &engine.list_feeds()[0];
    assert_eq!(feed.title, "Alpha Wire");
    assert_eq!(feed.description, "Alpha Wire top stories");
    assert!(feed.last_updated > 0);
    assert!(feed.last_error.is_empty());
}

#[tokio::test]
async fn refresh_all_feeds_skips_inactive_feeds() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", FEED_A_RSS).await;
    Mock::given(method("GET"))
        .and(path("/b.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_B_ATOM))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine();
    let url_b = format!("{}/b.xml", server.uri());
    engine.add_feed(&format!("{}/a.xml", server.uri())).unwrap();
    engine.add_feed(&url_b).unwrap();
    engine.set_feed_active(&url_b, false);

    assert_eq!(engine.refresh_all_feeds().await, 1);
}

#[tokio::test]
async fn per_feed_article_cap_keeps_the_most_recent() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", FEED_A_RSS).await;

    let engine = engine();
    engine.set_max_articles_per_feed(2);
    engine.add_feed(&format!("{}/a.xml", server.uri())).unwrap();

    let articles = engine.latest_news(false).await;
    let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
    // the undated item is the least recent and falls off
    assert_eq!(titles, vec!["Shared Headline", "Alpha One"]);
}

#[tokio::test]
async fn removing_a_feed_drops_its_articles() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", FEED_A_RSS).await;

    let engine = engine();
    let url = format!("{}/a.xml", server.uri());
    engine.add_feed(&url).unwrap();

    assert_eq!(engine.latest_news(false).await.len(), 3);
    assert!(engine.remove_feed(&url));
    assert!(engine.latest_news(false).await.is_empty());
}

#[tokio::test]
async fn failed_refresh_serves_the_last_good_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_A_RSS))
        .expect(1)
        .mount(&server)
        .await;
    // after the first success the server starts failing
    let engine = engine();
    let url = format!("{}/a.xml", server.uri());
    engine.add_feed(&url).unwrap();
    assert_eq!(engine.latest_news(false).await.len(), 3);

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/a.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    // forced refresh fails, but the cached set is still within TTL
    assert_eq!(engine.latest_news(true).await.len(), 3);
    assert!(engine.list_feeds()[0].last_error.contains("500"));
}

#[tokio::test]
async fn article_listing_json_uses_the_contract_keys() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", FEED_A_RSS).await;

    let engine = engine();
    engine.add_feed(&format!("{}/a.xml", server.uri())).unwrap();

    let json = engine.latest_news_json(false).await.unwrap();
    let articles: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert!(!articles.is_empty());

    let first = &articles[0];
    for key in [
        "id",
        "title",
        "description",
        "link",
        "source",
        "author",
        "category",
        "publishedDate",
        "cachedAt",
    ] {
        assert!(first.get(key).is_some(), "missing key {}", key);
    }
    assert!(first["cachedAt"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn feed_listing_json_uses_the_contract_keys() {
    let engine = engine();
    engine.add_feed("https://example.com/feed.xml").unwrap();

    let json = engine.feeds_json().unwrap();
    let feeds: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    for key in [
        "url",
        "title",
        "description",
        "lastError",
        "lastUpdated",
        "lastFetchAttempt",
        "isActive",
    ] {
        assert!(feeds[0].get(key).is_some(), "missing key {}", key);
    }
}

#[tokio::test]
async fn status_tracks_the_whole_cycle() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", FEED_A_RSS).await;

    let engine = engine();
    let url = format!("{}/a.xml", server.uri());
    engine.add_feed(&url).unwrap();
    engine.set_cache_ttl(10); // clamped to the floor
    engine.refresh_all_feeds().await;

    let status = engine.status();
    assert_eq!(status.feed_count, 1);
    assert_eq!(status.active_feed_count, 1);
    assert_eq!(status.cache_ttl_seconds, 300);
    assert_eq!(status.feeds[0].url, url);
    assert!(status.feeds[0].last_updated > 0);
}
