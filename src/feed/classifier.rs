//! Recency filtering and pin duration resolution.

use chrono::{DateTime, Duration, Utc};

use crate::feed::types::{Candidate, FeedItem, PinRule};

/// Resolve the pin duration for a set of categories.
///
/// Rules are applied in declaration order and every matching rule overwrites
/// the previous value, so the last matching rule wins. No match yields 0.
pub fn resolve_pin_days(categories: &[String], rules: &[PinRule]) -> i64 {
    let mut pin_days = 0;
    for rule in rules {
        if categories.iter().any(|c| *c == rule.name) {
            pin_days = rule.days;
        }
    }
    pin_days
}

/// Whether an item's effective date falls strictly after the cutoff.
///
/// Items without a parseable date are never recent.
pub fn is_recent(item: &FeedItem, cutoff: DateTime<Utc>) -> bool {
    matches!(item.published_at, Some(date) if date > cutoff)
}

/// The oldest instant an item may be dated at to still be ingested.
///
/// A window reaching past the representable range admits every dated item.
pub fn cutoff_for(now: DateTime<Utc>, cutoff_days: i64) -> DateTime<Utc> {
    Duration::try_days(cutoff_days)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Keep recent items and attach their pin durations, preserving order.
pub fn classify(
    items: Vec<FeedItem>,
    now: DateTime<Utc>,
    cutoff_days: i64,
    rules: &[PinRule],
) -> Vec<Candidate> {
    let cutoff = cutoff_for(now, cutoff_days);
    items
        .into_iter()
        .filter(|item| is_recent(item, cutoff))
        .map(|item| {
            let pin_days = resolve_pin_days(&item.categories, rules);
            Candidate { item, pin_days }
        })
        .collect()
}
