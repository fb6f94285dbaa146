//! Test helpers for integration tests.
//!
//! Provides a scripted feed fetcher and a recording posting service.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::time::Duration as StdDuration;

use feedpin::feed::{FeedSpec, ParsedItem};
use feedpin::{
    Database, DestinationConfig, DestinationId, DispatchSettings, Dispatcher, ExternalPostId,
    FeedFetcher, FeedRegistry, FeedpinError, NewPost, ParsedFeed, PostingService, Result,
};

/// Fixed "now" used by the tests: 2024-01-03 17:00 UTC, a Wednesday.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 3, 17, 0, 0).unwrap()
}

/// Build a parsed item dated `hours_ago` hours before [`now`].
pub fn item(link: &str, hours_ago: i64) -> ParsedItem {
    ParsedItem {
        link: Some(link.to_string()),
        title: Some(format!("<em>{link}</em>")),
        content: Some("<p>body</p>".to_string()),
        published: Some(now() - Duration::hours(hours_ago)),
        ..Default::default()
    }
}

/// Build a parsed item with categories.
pub fn item_with_categories(link: &str, hours_ago: i64, categories: &[&str]) -> ParsedItem {
    ParsedItem {
        categories: categories.iter().map(|c| c.to_string()).collect(),
        ..item(link, hours_ago)
    }
}

/// Feed fetcher serving fixed items per URL and counting requests.
#[derive(Default)]
pub struct ScriptedFetcher {
    feeds: Mutex<HashMap<String, Vec<ParsedItem>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `items` at `url`. URLs never set fail to fetch.
    pub fn set(&self, url: &str, items: Vec<ParsedItem>) {
        self.feeds.lock().unwrap().insert(url.to_string(), items);
    }

    /// Number of fetches of `url`.
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.feeds.lock().unwrap().get(url) {
            Some(items) => Ok(ParsedFeed {
                title: url.to_string(),
                items: items.clone(),
            }),
            None => Err(FeedpinError::Fetch(format!("no feed at {url}"))),
        }
    }
}

/// Posting service recording every call.
#[derive(Default)]
pub struct RecordingPoster {
    next_id: AtomicI64,
    pub created: Mutex<Vec<(NewPost, DestinationId)>>,
    pub featured: Mutex<Vec<(ExternalPostId, bool)>>,
    pub fail_posts: Mutex<bool>,
    pub fail_featured: Mutex<bool>,
}

impl RecordingPoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_links(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(post, _)| post.link.clone())
            .collect()
    }

    pub fn featured_calls(&self) -> Vec<(ExternalPostId, bool)> {
        self.featured.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostingService for RecordingPoster {
    async fn resolve_destination(&self, community: &str, instance: &str) -> Result<DestinationId> {
        Ok(DestinationId((community.len() * 100 + instance.len()) as i64))
    }

    async fn create_post(&self, post: &NewPost, destination: DestinationId) -> Result<ExternalPostId> {
        self.created.lock().unwrap().push((post.clone(), destination));
        if *self.fail_posts.lock().unwrap() {
            return Err(FeedpinError::External("post rejected".into()));
        }
        Ok(ExternalPostId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1))
    }

    async fn set_featured(&self, post_id: ExternalPostId, featured: bool) -> Result<()> {
        self.featured.lock().unwrap().push((post_id, featured));
        if *self.fail_featured.lock().unwrap() {
            return Err(FeedpinError::External("feature rejected".into()));
        }
        Ok(())
    }
}

/// Dispatch settings with no delay between posts.
pub fn settings(max_posts: usize) -> DispatchSettings {
    DispatchSettings {
        posting_enabled: true,
        cutoff_days: 7,
        max_posts,
        post_delay: StdDuration::ZERO,
    }
}

/// Create an in-memory database.
pub async fn setup_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().await.unwrap())
}

/// Build a dispatcher over scripted collaborators.
pub fn dispatcher(
    settings: DispatchSettings,
    feeds: Vec<FeedSpec>,
    destinations: Vec<DestinationConfig>,
    db: Arc<Database>,
    fetcher: Arc<ScriptedFetcher>,
    poster: Arc<RecordingPoster>,
) -> Dispatcher {
    let registry = FeedRegistry::new(feeds).unwrap();
    Dispatcher::new(settings, registry, destinations, db, fetcher, poster)
}
