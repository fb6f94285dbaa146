//! Feed ingestion for feedpin.
//!
//! Fetching, normalization, join/exclude algebra and the recency and pin
//! classification applied to every polled feed.

pub mod algebra;
pub mod classifier;
pub mod fetcher;
pub mod normalizer;
pub mod types;

pub use algebra::{admissible_items, combine, CycleFeeds, FeedRegistry};
pub use classifier::{classify, cutoff_for, is_recent, resolve_pin_days};
pub use fetcher::{parse_feed, validate_url, FeedFetcher, HttpFeedFetcher};
pub use normalizer::{normalize, normalize_all};
pub use types::{
    Candidate, ContentField, DateField, FeedItem, FeedSpec, ParsedFeed, ParsedItem, PinRule,
    MAX_FEED_SIZE,
};
