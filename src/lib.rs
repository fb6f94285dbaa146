//! feedpin - feed-to-community posting bot
//!
//! Polls syndication feeds, filters them through join/exclude rules and a
//! recency window, posts new items to federated communities and keeps
//! selected posts pinned for a number of days.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod lifecycle;
pub mod logging;
pub mod markup;
pub mod notification;
pub mod posting;
pub mod scheduler;

pub use config::{BotConfig, Config, DestinationConfig};
pub use db::{Database, DayClockRepository, InsertOutcome, PostRecord, PostRepository};
pub use dispatch::{CycleReport, DispatchSettings, Dispatcher};
pub use error::{FeedpinError, Result};
pub use feed::{FeedFetcher, FeedItem, FeedRegistry, FeedSpec, HttpFeedFetcher, ParsedFeed};
pub use lifecycle::{DecayClock, DecayReport};
pub use notification::{EventOutcome, NotificationHandler, PostEvent};
pub use posting::{DestinationId, DryRunPoster, ExternalPostId, NewPost, PostingService};
pub use scheduler::{BusyFlag, BusyGuard};
