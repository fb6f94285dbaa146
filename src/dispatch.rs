//! Poll cycle orchestration.
//!
//! Every cycle walks the configured feeds in order, computes each feed's
//! admissible items, keeps the recent ones, records them in the dedup store
//! and posts newly inserted items to every destination that carries the feed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::config::{BotConfig, DestinationConfig};
use crate::db::{Database, InsertOutcome, PostRepository};
use crate::feed::{admissible_items, classify, CycleFeeds, FeedFetcher, FeedItem, FeedRegistry};
use crate::markup::translate;
use crate::posting::{DestinationId, NewPost, PostingService};
use crate::Result;

/// Dispatch behaviour taken from the bot configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Whether new items are posted.
    pub posting_enabled: bool,
    /// Recency window in days.
    pub cutoff_days: i64,
    /// Post attempts allowed per cycle (0 = unlimited).
    pub max_posts: usize,
    /// Pause after each post attempt.
    pub post_delay: Duration,
}

impl DispatchSettings {
    /// Build settings from the `[bot]` section.
    pub fn from_config(bot: &BotConfig) -> Self {
        Self {
            posting_enabled: bot.posting_enabled,
            cutoff_days: bot.cutoff_days,
            max_posts: bot.max_posts,
            post_delay: Duration::from_millis(bot.post_delay_ms),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&BotConfig::default())
    }
}

/// Counters describing one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Feeds fetched successfully.
    pub feeds_processed: usize,
    /// Feeds whose own fetch failed.
    pub feeds_failed: usize,
    /// Recent admissible items seen.
    pub items_considered: usize,
    /// Items newly recorded in the store.
    pub inserted: usize,
    /// Items already known.
    pub duplicates: usize,
    /// Posts created on the external service.
    pub posts_created: usize,
    /// Post attempts that failed.
    pub posts_failed: usize,
    /// Whether the cycle stopped at the post cap.
    pub cap_reached: bool,
}

impl CycleReport {
    /// Post attempts made, successful or not.
    pub fn post_attempts(&self) -> usize {
        self.posts_created + self.posts_failed
    }
}

/// Runs poll cycles against the store and the external services.
pub struct Dispatcher {
    settings: DispatchSettings,
    registry: FeedRegistry,
    destinations: Vec<DestinationConfig>,
    db: Arc<Database>,
    fetcher: Arc<dyn FeedFetcher>,
    poster: Arc<dyn PostingService>,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(
        settings: DispatchSettings,
        registry: FeedRegistry,
        destinations: Vec<DestinationConfig>,
        db: Arc<Database>,
        fetcher: Arc<dyn FeedFetcher>,
        poster: Arc<dyn PostingService>,
    ) -> Self {
        Self {
            settings,
            registry,
            destinations,
            db,
            fetcher,
            poster,
        }
    }

    /// Dispatch settings in use.
    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Run one cycle at the current time.
    pub async fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as if the time were `now`.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        info!("Feed poll started ({} feed(s))", self.registry.len());

        let mut report = CycleReport::default();
        let mut feeds = CycleFeeds::new(&self.registry, self.fetcher.as_ref());
        let mut resolved: HashMap<(String, String), DestinationId> = HashMap::new();
        let posts = PostRepository::new(self.db.pool());

        'feeds: for spec in self.registry.iter() {
            let items = admissible_items(spec, &mut feeds).await;
            if feeds.has_failed(&spec.name) {
                report.feeds_failed += 1;
                continue;
            }
            report.feeds_processed += 1;

            let candidates = classify(items, now, self.settings.cutoff_days, &spec.pin_categories);
            report.items_considered += candidates.len();

            for candidate in candidates {
                let link = &candidate.item.link;
                match posts.try_insert(link, candidate.pin_days).await {
                    Ok(InsertOutcome::Inserted) => {
                        info!("Inserted {} (pin days: {})", link, candidate.pin_days);
                        report.inserted += 1;
                    }
                    Ok(InsertOutcome::AlreadyPresent) => {
                        report.duplicates += 1;
                        continue;
                    }
                    Err(e) => {
                        error!("Failed to record {}: {}", link, e);
                        continue;
                    }
                }

                if !self.settings.posting_enabled {
                    continue;
                }

                for destination in self.destinations.iter().filter(|d| d.accepts(&spec.name)) {
                    debug!(
                        "Creating post for {} in {}@{}",
                        link, destination.community, destination.instance
                    );
                    match self.post(&candidate.item, destination, &mut resolved).await {
                        Ok(_) => report.posts_created += 1,
                        Err(e) => {
                            warn!(
                                "Failed to post {} to {}@{}: {}",
                                link, destination.community, destination.instance, e
                            );
                            report.posts_failed += 1;
                        }
                    }

                    if self.settings.max_posts != 0
                        && report.post_attempts() >= self.settings.max_posts
                    {
                        info!("Max posts reached ({})", self.settings.max_posts);
                        report.cap_reached = true;
                        break 'feeds;
                    }

                    sleep(self.settings.post_delay).await;
                }
            }

            debug!("Feed {} processed", spec.name);
        }

        info!(
            "Feed poll complete: {} inserted, {} duplicate(s), {} post(s), {} failed",
            report.inserted, report.duplicates, report.posts_created, report.posts_failed
        );
        report
    }

    /// Publish one item to one destination.
    async fn post(
        &self,
        item: &FeedItem,
        destination: &DestinationConfig,
        resolved: &mut HashMap<(String, String), DestinationId>,
    ) -> Result<()> {
        let key = (destination.instance.clone(), destination.community.clone());
        let destination_id = match resolved.get(&key) {
            Some(id) => *id,
            None => {
                let id = self
                    .poster
                    .resolve_destination(&destination.community, &destination.instance)
                    .await?;
                resolved.insert(key, id);
                id
            }
        };

        let post = NewPost {
            title: translate(&item.title),
            body: translate(&item.body),
            link: item.link.clone(),
        };
        let post_id = self.poster.create_post(&post, destination_id).await?;
        info!("Created post {} for {}", post_id, item.link);
        Ok(())
    }
}
