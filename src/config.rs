//! Configuration module for feedpin.

use std::path::Path;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::feed::{validate_url, FeedRegistry, FeedSpec, MAX_FEED_SIZE};
use crate::{FeedpinError, Result};

/// Largest accepted recency window, in days.
pub const MAX_CUTOFF_DAYS: i64 = 36_500;

/// Environment variable overriding `bot.username`.
pub const USERNAME_ENV: &str = "FEEDPIN_USERNAME";

/// Bot behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Account name the bot posts as; used to recognise its own posts.
    #[serde(default)]
    pub username: String,
    /// Whether new items are posted at all.
    #[serde(default = "default_posting_enabled")]
    pub posting_enabled: bool,
    /// Minutes between feed polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_mins: u64,
    /// Minutes between day rollover checks.
    #[serde(default = "default_day_check_interval")]
    pub day_check_interval_mins: u64,
    /// Timezone deciding when a day rolls over.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Items older than this many days are ignored.
    #[serde(default = "default_cutoff_days")]
    pub cutoff_days: i64,
    /// Maximum posts per poll cycle (0 = unlimited).
    #[serde(default = "default_max_posts")]
    pub max_posts: usize,
    /// Delay between posts in milliseconds.
    #[serde(default = "default_post_delay")]
    pub post_delay_ms: u64,
}

fn default_posting_enabled() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    10
}

fn default_day_check_interval() -> u64 {
    10
}

fn default_timezone() -> String {
    "America/Toronto".to_string()
}

fn default_cutoff_days() -> i64 {
    7
}

fn default_max_posts() -> usize {
    5
}

fn default_post_delay() -> u64 {
    2000
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            posting_enabled: default_posting_enabled(),
            poll_interval_mins: default_poll_interval(),
            day_check_interval_mins: default_day_check_interval(),
            timezone: default_timezone(),
            cutoff_days: default_cutoff_days(),
            max_posts: default_max_posts(),
            post_delay_ms: default_post_delay(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedpin.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file; empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedpin.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// HTTP fetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// User agent sent with feed requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
}

fn default_user_agent() -> String {
    concat!("feedpin/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    MAX_FEED_SIZE
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
        }
    }
}

/// A community that receives posts from a set of feeds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DestinationConfig {
    /// Instance host, e.g. `lemmy.example.org`.
    pub instance: String,
    /// Community name on that instance.
    pub community: String,
    /// Names of the feeds posted here.
    #[serde(default)]
    pub feeds: Vec<String>,
}

impl DestinationConfig {
    /// Create a destination.
    pub fn new(instance: impl Into<String>, community: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            community: community.into(),
            feeds: Vec::new(),
        }
    }

    /// Add a feed posted to this destination.
    pub fn with_feed(mut self, name: impl Into<String>) -> Self {
        self.feeds.push(name.into());
        self
    }

    /// Whether posts from the named feed go here.
    pub fn accepts(&self, feed: &str) -> bool {
        self.feeds.iter().any(|f| f == feed)
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Bot behaviour.
    #[serde(default)]
    pub bot: BotConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Feeds, in processing order.
    #[serde(default)]
    pub feeds: Vec<FeedSpec>,
    /// Destinations, in fan-out order.
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedpinError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedpinError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDPIN_USERNAME`: Override the bot account name
    pub fn apply_env_overrides(&mut self) {
        if let Ok(username) = std::env::var(USERNAME_ENV) {
            if !username.is_empty() {
                self.bot.username = username;
            }
        }
    }

    /// Parse the configured timezone.
    pub fn timezone(&self) -> Result<Tz> {
        self.bot
            .timezone
            .parse()
            .map_err(|_| FeedpinError::Config(format!("unknown timezone: {}", self.bot.timezone)))
    }

    /// Validate the configuration and build the feed registry.
    ///
    /// Returns an error if:
    /// - The timezone is unknown, an interval is zero or `cutoff_days` is out
    ///   of range
    /// - A feed URL is invalid, a feed name is duplicated or a join/exclude
    ///   reference is dangling
    /// - A destination names a feed that does not exist
    pub fn validate(&self) -> Result<FeedRegistry> {
        self.timezone()?;

        if self.bot.poll_interval_mins == 0 || self.bot.day_check_interval_mins == 0 {
            return Err(FeedpinError::Config(
                "poll and day check intervals must be at least one minute".into(),
            ));
        }
        if !(0..=MAX_CUTOFF_DAYS).contains(&self.bot.cutoff_days) {
            return Err(FeedpinError::Config(format!(
                "cutoff_days must be between 0 and {}",
                MAX_CUTOFF_DAYS
            )));
        }

        for feed in &self.feeds {
            validate_url(&feed.url)
                .map_err(|e| FeedpinError::Config(format!("feed {}: {}", feed.name, e)))?;
            if let Some(rule) = feed.pin_categories.iter().find(|r| r.days < 0) {
                return Err(FeedpinError::Config(format!(
                    "feed {}: pin days for {} must not be negative",
                    feed.name, rule.name
                )));
            }
        }

        let registry = FeedRegistry::new(self.feeds.clone())?;

        for destination in &self.destinations {
            if let Some(name) = destination.feeds.iter().find(|f| !registry.contains(f)) {
                return Err(FeedpinError::Config(format!(
                    "destination {}@{} references unknown feed {}",
                    destination.community, destination.instance, name
                )));
            }
        }

        Ok(registry)
    }
}
