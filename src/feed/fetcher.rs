//! Feed fetcher.
//!
//! Fetches feeds over HTTP and parses them with `feed-rs` into
//! [`ParsedFeed`]. The [`FeedFetcher`] trait is the seam the dispatch loop
//! depends on, so tests can substitute scripted feeds.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;

use crate::config::FetchConfig;
use crate::error::{FeedpinError, Result};
use crate::feed::types::{ParsedFeed, ParsedItem};

/// Source of parsed feeds.
///
/// Network and parse failures are reported as [`FeedpinError::Fetch`].
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}

/// HTTP feed fetcher with timeouts and a size limit.
pub struct HttpFeedFetcher {
    client: Client,
    max_feed_size: u64,
}

impl HttpFeedFetcher {
    /// Create a new fetcher from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FeedpinError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedpinError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedpinError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FeedpinError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedpinError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(FeedpinError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        parse_feed(&bytes)
    }
}

/// Validate that a feed URL is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedpinError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedpinError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(FeedpinError::Validation("URL has no host".to_string()));
    }

    Ok(())
}

/// Parse feed bytes into a ParsedFeed.
///
/// Item text is kept as raw HTML; markup translation happens at post time.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)
        .map_err(|e| FeedpinError::Fetch(format!("failed to parse feed: {}", e)))?;

    let title = feed
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled Feed".to_string());

    let items = feed
        .entries
        .into_iter()
        .map(|entry| ParsedItem {
            link: entry.links.first().map(|l| l.href.clone()),
            title: entry.title.map(|t| t.content),
            content: entry.content.and_then(|c| c.body),
            summary: entry.summary.map(|t| t.content),
            published: entry.published,
            updated: entry.updated,
            categories: entry.categories.into_iter().map(|c| c.term).collect(),
        })
        .collect();

    Ok(ParsedFeed { title, items })
}
