//! Day rollover and pin decay.
//!
//! Once per local day every featured record loses one pin day. Records that
//! reach zero are unfeatured on the external service and then locally.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::db::{Database, DayClockRepository, PostRecord, PostRepository};
use crate::posting::PostingService;
use crate::Result;

/// Lead time added to `now` before taking the weekday.
pub const ROLLOVER_LEAD_MINUTES: i64 = 30;

/// Weekday (0 = Sunday) that a check at `now` belongs to.
///
/// Checks shortly before local midnight already count as the next day.
pub fn current_day(now: DateTime<Utc>, tz: Tz) -> i64 {
    let shifted = (now + Duration::minutes(ROLLOVER_LEAD_MINUTES)).with_timezone(&tz);
    i64::from(shifted.weekday().num_days_from_sunday())
}

/// Stages of a single decay check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayState {
    /// Comparing the current day with the stored one.
    Idle,
    /// The day changed: store it and decrement pin days.
    Rolled { day: i64 },
    /// Unfeaturing records whose pin days ran out.
    Decaying { day: i64 },
    /// Every expired record was handled.
    Settled,
}

/// Outcome of one decay check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecayReport {
    /// Whether the day rolled over.
    pub rolled: bool,
    /// Day observed by the check.
    pub day: i64,
    /// Records whose pin days were decremented.
    pub decremented: u64,
    /// Records unfeatured on the external service and locally.
    pub unfeatured: usize,
    /// Records unfeatured locally only, having no external id.
    pub orphaned: usize,
    /// Records left featured because the external call failed.
    pub failed: usize,
}

/// Persistent day clock driving pin decay.
pub struct DecayClock {
    db: Arc<Database>,
    poster: Arc<dyn PostingService>,
    timezone: Tz,
}

impl DecayClock {
    /// Create a decay clock for the given timezone.
    pub fn new(db: Arc<Database>, poster: Arc<dyn PostingService>, timezone: Tz) -> Self {
        Self {
            db,
            poster,
            timezone,
        }
    }

    /// Run a check at the current time.
    pub async fn check(&self) -> Result<DecayReport> {
        self.check_at(Utc::now()).await
    }

    /// Run a check as if the time were `now`.
    pub async fn check_at(&self, now: DateTime<Utc>) -> Result<DecayReport> {
        let mut report = DecayReport {
            day: current_day(now, self.timezone),
            ..Default::default()
        };

        let mut state = DecayState::Idle;
        loop {
            debug!("Decay clock state: {:?}", state);
            state = match state {
                DecayState::Idle => {
                    let last = DayClockRepository::new(self.db.pool()).last_day().await?;
                    if last == report.day {
                        return Ok(report);
                    }
                    DecayState::Rolled { day: report.day }
                }
                DecayState::Rolled { day } => {
                    let clock = DayClockRepository::new(self.db.pool());
                    // Another check may have rolled the day in between.
                    let Some(decremented) = clock.advance(day).await? else {
                        return Ok(report);
                    };
                    report.rolled = true;
                    report.decremented = decremented;
                    info!(
                        "Day rolled over to {}: {} featured post(s) decayed",
                        day, decremented
                    );
                    DecayState::Decaying { day }
                }
                DecayState::Decaying { day } => {
                    let expired = PostRepository::new(self.db.pool()).list_expired().await?;
                    debug!("{} post(s) expired on day {}", expired.len(), day);
                    for record in expired {
                        self.expire(&record, &mut report).await;
                    }
                    DecayState::Settled
                }
                DecayState::Settled => {
                    if report.unfeatured + report.orphaned + report.failed > 0 {
                        info!(
                            "Decay settled: {} unfeatured, {} orphaned, {} failed",
                            report.unfeatured, report.orphaned, report.failed
                        );
                    }
                    return Ok(report);
                }
            };
        }
    }

    /// Unfeature one expired record.
    async fn expire(&self, record: &PostRecord, report: &mut DecayReport) {
        let posts = PostRepository::new(self.db.pool());

        match record.external_post_id {
            Some(post_id) => {
                if let Err(e) = self.poster.set_featured(post_id, false).await {
                    warn!("Failed to unfeature post {} ({}): {}", post_id, record.link, e);
                    report.failed += 1;
                    return;
                }
                match posts.unfeature(&record.link).await {
                    Ok(_) => report.unfeatured += 1,
                    Err(e) => error!("Failed to unfeature record {}: {}", record.link, e),
                }
            }
            None => {
                warn!("Expired record {} has no external post id", record.link);
                match posts.unfeature(&record.link).await {
                    Ok(_) => report.orphaned += 1,
                    Err(e) => error!("Failed to unfeature record {}: {}", record.link, e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::{DestinationId, ExternalPostId, NewPost};
    use crate::FeedpinError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FeatureLog {
        calls: Mutex<Vec<(ExternalPostId, bool)>>,
        fail: bool,
    }

    #[async_trait]
    impl PostingService for FeatureLog {
        async fn resolve_destination(&self, _: &str, _: &str) -> Result<DestinationId> {
            Ok(DestinationId(1))
        }

        async fn create_post(&self, _: &NewPost, _: DestinationId) -> Result<ExternalPostId> {
            Ok(ExternalPostId(1))
        }

        async fn set_featured(&self, post_id: ExternalPostId, featured: bool) -> Result<()> {
            self.calls.lock().unwrap().push((post_id, featured));
            if self.fail {
                Err(FeedpinError::External("unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    fn toronto() -> Tz {
        "America/Toronto".parse().unwrap()
    }

    // Wednesday 2024-01-03 12:00 in Toronto.
    fn wednesday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 17, 0, 0).unwrap()
    }

    #[test]
    fn test_current_day_in_timezone() {
        assert_eq!(current_day(wednesday_noon(), toronto()), 3);

        // 22:00 Wednesday in Toronto is already Thursday in UTC.
        let late = Utc.with_ymd_and_hms(2024, 1, 4, 3, 0, 0).unwrap();
        assert_eq!(current_day(late, toronto()), 3);
    }

    #[test]
    fn test_current_day_lead_time() {
        // 23:29 Saturday stays Saturday, 23:31 already counts as Sunday.
        let before = Utc.with_ymd_and_hms(2024, 1, 7, 4, 29, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 7, 4, 31, 0).unwrap();
        assert_eq!(current_day(before, toronto()), 6);
        assert_eq!(current_day(after, toronto()), 0);
    }

    async fn setup(fail: bool) -> (Arc<Database>, Arc<FeatureLog>, DecayClock) {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let poster = Arc::new(FeatureLog {
            fail,
            ..Default::default()
        });
        let clock = DecayClock::new(db.clone(), poster.clone(), toronto());
        (db, poster, clock)
    }

    #[tokio::test]
    async fn test_same_day_does_nothing() {
        let (db, poster, clock) = setup(false).await;
        DayClockRepository::new(db.pool()).advance(3).await.unwrap();
        PostRepository::new(db.pool())
            .try_insert("https://example.com/1", 1)
            .await
            .unwrap();

        let report = clock.check_at(wednesday_noon()).await.unwrap();
        assert!(!report.rolled);
        assert_eq!(report.day, 3);
        assert!(poster.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollover_unfeatures_expired() {
        let (db, poster, clock) = setup(false).await;
        let posts = PostRepository::new(db.pool());
        posts.try_insert("https://example.com/1", 1).await.unwrap();
        posts
            .record_external_id("https://example.com/1", ExternalPostId(9))
            .await
            .unwrap();

        let report = clock.check_at(wednesday_noon()).await.unwrap();
        assert!(report.rolled);
        assert_eq!(report.decremented, 1);
        assert_eq!(report.unfeatured, 1);
        assert_eq!(*poster.calls.lock().unwrap(), vec![(ExternalPostId(9), false)]);

        let record = posts.get_by_link("https://example.com/1").await.unwrap().unwrap();
        assert!(!record.featured);
        assert_eq!(record.pin_days, 0);
    }

    #[tokio::test]
    async fn test_rollover_without_expired_records() {
        let (db, poster, clock) = setup(false).await;
        let posts = PostRepository::new(db.pool());
        posts.try_insert("https://example.com/1", 3).await.unwrap();

        let report = clock.check_at(wednesday_noon()).await.unwrap();
        assert!(report.rolled);
        assert_eq!(report.decremented, 1);
        assert_eq!(report.unfeatured + report.orphaned + report.failed, 0);
        assert_eq!(DayClockRepository::new(db.pool()).last_day().await.unwrap(), 3);
        assert!(poster.calls.lock().unwrap().is_empty());

        let record = posts.get_by_link("https://example.com/1").await.unwrap().unwrap();
        assert_eq!(record.pin_days, 2);
        assert!(record.featured);
    }

    #[tokio::test]
    async fn test_orphaned_record_is_unfeatured_locally() {
        let (db, poster, clock) = setup(false).await;
        let posts = PostRepository::new(db.pool());
        posts.try_insert("https://example.com/1", 1).await.unwrap();

        let report = clock.check_at(wednesday_noon()).await.unwrap();
        assert_eq!(report.orphaned, 1);
        assert_eq!(report.unfeatured, 0);
        assert!(poster.calls.lock().unwrap().is_empty());
        assert_eq!(posts.count_featured().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_unfeature_stays_featured() {
        let (db, _poster, clock) = setup(true).await;
        let posts = PostRepository::new(db.pool());
        posts.try_insert("https://example.com/1", 1).await.unwrap();
        posts
            .record_external_id("https://example.com/1", ExternalPostId(4))
            .await
            .unwrap();

        let report = clock.check_at(wednesday_noon()).await.unwrap();
        assert_eq!(report.failed, 1);

        let record = posts.get_by_link("https://example.com/1").await.unwrap().unwrap();
        assert!(record.featured);
        assert_eq!(record.pin_days, 0);
    }
}
