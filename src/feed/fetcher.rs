use crate::error::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Result of one transport-level GET: the raw body and the HTTP status.
/// Format detection and parsing happen elsewhere.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub body: String,
    pub status_code: u16,
}

/// HTTP transport for feed documents.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    timeout_duration: Duration,
    user_agent: String,
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedFetcher {
    pub fn new() -> Self {
        Self::with_timeout_secs(10)
    }

    pub fn with_timeout_secs(secs: u64) -> Self {
        let timeout_duration = Duration::from_secs(secs);
        let client = Client::builder()
            .timeout(timeout_duration)
            .redirect(reqwest::redirect::Policy::limited(10))
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            timeout_duration,
            user_agent: format!("newswire/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Performs a GET for a feed document.
    ///
    /// Connection errors, timeouts, and non-2xx statuses all map to
    /// their own error variants; a successful return always carries a
    /// 2xx status and the full body.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        validate_feed_url(url)?;

        debug!("Fetching feed from: {}", url);

        let response = timeout(self.timeout_duration, self.send_request(url))
            .await
            .map_err(|_| Error::Timeout(format!("Request to {} timed out", url)))??;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!(
                "HTTP {} for {}: {}",
                status.as_u16(),
                url,
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }

        let status_code = status.as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::HttpError(format!("Failed to read response body: {}", e)))?;

        debug!("Downloaded {} bytes from {}", body.len(), url);

        Ok(FetchResponse { body, status_code })
    }

    async fn send_request(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header(
                "Accept",
                "application/rss+xml, application/atom+xml, application/xml, text/xml, */*",
            )
            .send()
            .await
            .map_err(|e| Error::HttpError(format!("Request failed: {}", e)))
    }
}

/// Feeds are fetched over http(s) only.
pub fn validate_feed_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::InvalidUrl(format!("Unsupported scheme: {}", scheme))),
    }
}
