//! Join/exclude set algebra across related feeds.
//!
//! A feed may declare `join` feeds (its items must also appear in one of
//! them) and `exclude` feeds (its items must not appear in any of them).
//! Items are compared by link only; output items always come from the
//! target feed.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{FeedpinError, Result};
use crate::feed::fetcher::FeedFetcher;
use crate::feed::normalizer::normalize_all;
use crate::feed::types::{FeedItem, FeedSpec};

/// Configured feeds indexed by name.
///
/// Built once at startup; rejects duplicate names and join/exclude
/// references to feeds that do not exist.
#[derive(Debug, Clone)]
pub struct FeedRegistry {
    feeds: Vec<FeedSpec>,
    index: HashMap<String, usize>,
}

impl FeedRegistry {
    /// Build a registry from feeds in configuration order.
    pub fn new(feeds: Vec<FeedSpec>) -> Result<Self> {
        let mut index = HashMap::with_capacity(feeds.len());
        for (i, feed) in feeds.iter().enumerate() {
            if feed.name.is_empty() {
                return Err(FeedpinError::Config("feed name must not be empty".into()));
            }
            if index.insert(feed.name.clone(), i).is_some() {
                return Err(FeedpinError::Config(format!(
                    "duplicate feed name: {}",
                    feed.name
                )));
            }
        }

        for feed in &feeds {
            for name in feed.join.iter().chain(feed.exclude.iter()) {
                if !index.contains_key(name) {
                    return Err(FeedpinError::Config(format!(
                        "feed {} references unknown feed {}",
                        feed.name, name
                    )));
                }
            }
        }

        Ok(Self { feeds, index })
    }

    /// Look up a feed by name.
    pub fn get(&self, name: &str) -> Option<&FeedSpec> {
        self.index.get(name).map(|&i| &self.feeds[i])
    }

    /// Whether a feed with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Feeds in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &FeedSpec> {
        self.feeds.iter()
    }

    /// Number of feeds.
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Whether no feeds are configured.
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

/// Per-cycle view of fetched feeds.
///
/// Each feed is fetched at most once per cycle. A failed fetch is logged and
/// remembered as an empty item list.
pub struct CycleFeeds<'a> {
    registry: &'a FeedRegistry,
    fetcher: &'a dyn FeedFetcher,
    cache: HashMap<String, Vec<FeedItem>>,
    failed: HashSet<String>,
}

impl<'a> CycleFeeds<'a> {
    /// Start a new cycle.
    pub fn new(registry: &'a FeedRegistry, fetcher: &'a dyn FeedFetcher) -> Self {
        Self {
            registry,
            fetcher,
            cache: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// Items of the named feed, fetching it on first use.
    pub async fn items(&mut self, name: &str) -> Vec<FeedItem> {
        if let Some(items) = self.cache.get(name) {
            return items.clone();
        }

        let items = match self.registry.get(name) {
            Some(spec) => match self.fetcher.fetch(&spec.url).await {
                Ok(parsed) => {
                    let items = normalize_all(parsed.items, spec);
                    debug!("Fetched {} item(s) from feed {}", items.len(), name);
                    items
                }
                Err(e) => {
                    warn!("Skipping feed {}: {}", name, e);
                    self.failed.insert(name.to_string());
                    Vec::new()
                }
            },
            None => {
                warn!("Skipping unknown feed {}", name);
                self.failed.insert(name.to_string());
                Vec::new()
            }
        };

        self.cache.insert(name.to_string(), items.clone());
        items
    }

    /// Whether the named feed failed to fetch in this cycle.
    pub fn has_failed(&self, name: &str) -> bool {
        self.failed.contains(name)
    }

    /// Union of the links of the named feeds.
    async fn links_of(&mut self, names: &[String]) -> HashSet<String> {
        let mut links = HashSet::new();
        for name in names {
            links.extend(self.items(name).await.into_iter().map(|item| item.link));
        }
        links
    }
}

/// Apply join intersection, then exclude removal, to a feed's items.
///
/// `None` means the feed declares no join (or exclude) feeds.
pub fn combine(
    items: Vec<FeedItem>,
    joined: Option<&HashSet<String>>,
    excluded: Option<&HashSet<String>>,
) -> Vec<FeedItem> {
    let items: Vec<FeedItem> = match joined {
        Some(links) => items
            .into_iter()
            .filter(|item| links.contains(&item.link))
            .collect(),
        None => items,
    };

    match excluded {
        Some(links) => items
            .into_iter()
            .filter(|item| !links.contains(&item.link))
            .collect(),
        None => items,
    }
}

/// Compute the admissible items of a feed for this cycle.
pub async fn admissible_items(spec: &FeedSpec, feeds: &mut CycleFeeds<'_>) -> Vec<FeedItem> {
    let items = feeds.items(&spec.name).await;

    let joined = if spec.join.is_empty() {
        None
    } else {
        debug!("Joining feeds for {}", spec.name);
        Some(feeds.links_of(&spec.join).await)
    };

    let excluded = if spec.exclude.is_empty() {
        None
    } else {
        debug!("Fetching exclusion feeds for {}", spec.name);
        Some(feeds.links_of(&spec.exclude).await)
    };

    combine(items, joined.as_ref(), excluded.as_ref())
}
