//! Feed types for feedpin.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Maximum feed size in bytes (5MB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

/// Which entry field supplies the post body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentField {
    /// Full entry content (`<content:encoded>` / Atom `<content>`).
    #[default]
    Body,
    /// Entry summary (`<description>` / Atom `<summary>`).
    Summary,
}

/// Which entry timestamp decides recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    /// Publication date.
    #[default]
    Published,
    /// Last-updated date.
    Updated,
}

/// A category name that pins matching items for a number of days.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PinRule {
    /// Category name, compared exactly.
    pub name: String,
    /// Days the post stays featured.
    pub days: i64,
}

impl PinRule {
    /// Create a new pin rule.
    pub fn new(name: impl Into<String>, days: i64) -> Self {
        Self {
            name: name.into(),
            days,
        }
    }
}

/// A configured feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedSpec {
    /// Unique feed name, referenced by joins, excludes and destinations.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Field used for the post body.
    #[serde(default)]
    pub content: ContentField,
    /// Field used for the recency check.
    #[serde(default)]
    pub date_field: DateField,
    /// Feeds whose links this feed's items must appear in.
    #[serde(default)]
    pub join: Vec<String>,
    /// Feeds whose links are removed from this feed's items.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Category pin rules, in declaration order.
    #[serde(default)]
    pub pin_categories: Vec<PinRule>,
}

impl FeedSpec {
    /// Create a feed with default settings.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            content: ContentField::default(),
            date_field: DateField::default(),
            join: Vec::new(),
            exclude: Vec::new(),
            pin_categories: Vec::new(),
        }
    }

    /// Set the content field.
    pub fn with_content(mut self, content: ContentField) -> Self {
        self.content = content;
        self
    }

    /// Set the date field.
    pub fn with_date_field(mut self, date_field: DateField) -> Self {
        self.date_field = date_field;
        self
    }

    /// Add a join feed.
    pub fn with_join(mut self, name: impl Into<String>) -> Self {
        self.join.push(name.into());
        self
    }

    /// Add an exclude feed.
    pub fn with_exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }

    /// Add a pin rule.
    pub fn with_pin_rule(mut self, name: impl Into<String>, days: i64) -> Self {
        self.pin_categories.push(PinRule::new(name, days));
        self
    }
}

/// Parsed feed data from an external source.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Feed title.
    pub title: String,
    /// Parsed items, in source order.
    pub items: Vec<ParsedItem>,
}

/// Parsed item data from an external source.
#[derive(Debug, Clone, Default)]
pub struct ParsedItem {
    /// Link to the original article.
    pub link: Option<String>,
    /// Item title.
    pub title: Option<String>,
    /// Full content (raw HTML).
    pub content: Option<String>,
    /// Summary (raw HTML).
    pub summary: Option<String>,
    /// Publication date, if present and parseable.
    pub published: Option<DateTime<Utc>>,
    /// Last-updated date, if present and parseable.
    pub updated: Option<DateTime<Utc>>,
    /// Category terms.
    pub categories: Vec<String>,
}

/// A normalized feed item.
///
/// Identity and deduplication are defined by `link` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    /// Link to the original article; never empty.
    pub link: String,
    /// Item title.
    pub title: String,
    /// Post body, taken from the configured content field.
    pub body: String,
    /// Effective date from the configured date field.
    pub published_at: Option<DateTime<Utc>>,
    /// Category terms.
    pub categories: Vec<String>,
}

impl FeedItem {
    /// Create an item with empty title and body.
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            title: String::new(),
            body: String::new(),
            published_at: None,
            categories: Vec::new(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the effective date.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Add a category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }
}

/// A recent item with its resolved pin duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The item.
    pub item: FeedItem,
    /// Days to keep the post featured (0 = never featured).
    pub pin_days: i64,
}
