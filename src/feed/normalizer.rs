//! Maps parsed feed entries to [`FeedItem`]s.

use tracing::debug;

use crate::feed::types::{ContentField, DateField, FeedItem, FeedSpec, ParsedItem};

/// Normalize a parsed item according to the feed's field settings.
///
/// Returns `None` for items without a usable link, since the link is the
/// item's identity.
pub fn normalize(item: ParsedItem, spec: &FeedSpec) -> Option<FeedItem> {
    let link = match item.link.map(|l| l.trim().to_string()) {
        Some(link) if !link.is_empty() => link,
        _ => {
            debug!("Dropping item without link from feed {}", spec.name);
            return None;
        }
    };

    let body = match spec.content {
        ContentField::Body => item.content,
        ContentField::Summary => item.summary,
    };

    let published_at = match spec.date_field {
        DateField::Published => item.published,
        DateField::Updated => item.updated,
    };

    Some(FeedItem {
        link,
        title: item.title.unwrap_or_default(),
        body: body.unwrap_or_default(),
        published_at,
        categories: item.categories,
    })
}

/// Normalize every item of a feed, preserving source order.
pub fn normalize_all(items: Vec<ParsedItem>, spec: &FeedSpec) -> Vec<FeedItem> {
    items
        .into_iter()
        .filter_map(|item| normalize(item, spec))
        .collect()
}
