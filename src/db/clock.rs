//! Day clock repository.

use super::DbPool;
use crate::Result;

/// Clock key holding the last observed weekday.
pub const DAY_KEY: &str = "day";

/// Repository for the persisted day clock.
pub struct DayClockRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> DayClockRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get the last observed weekday (0 = Sunday).
    pub async fn last_day(&self) -> Result<i64> {
        let day: Option<i64> = sqlx::query_scalar("SELECT value FROM clock WHERE key = $1")
            .bind(DAY_KEY)
            .fetch_optional(self.pool)
            .await?;
        Ok(day.unwrap_or(0))
    }

    /// Record `day` as observed and decay every featured record by one day.
    ///
    /// Does nothing and returns `None` if `day` is already the last observed
    /// day. Otherwise the day write and the decrement commit together and the
    /// number of decremented records is returned.
    pub async fn advance(&self, day: i64) -> Result<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let last: Option<i64> = sqlx::query_scalar("SELECT value FROM clock WHERE key = $1")
            .bind(DAY_KEY)
            .fetch_optional(&mut *tx)
            .await?;

        if last == Some(day) {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO clock (key, value) VALUES ($1, $2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(DAY_KEY)
        .bind(day)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE posts SET pin_days = MAX(pin_days - 1, 0) WHERE featured = 1",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(result.rows_affected()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PostRepository;
    use crate::Database;

    #[tokio::test]
    async fn test_last_day_defaults_to_seed() {
        let db = Database::open_in_memory().await.unwrap();
        let clock = DayClockRepository::new(db.pool());
        assert_eq!(clock.last_day().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_advance_same_day_is_noop() {
        let db = Database::open_in_memory().await.unwrap();
        let posts = PostRepository::new(db.pool());
        posts.try_insert("https://example.com/1", 2).await.unwrap();

        let clock = DayClockRepository::new(db.pool());
        assert_eq!(clock.advance(0).await.unwrap(), None);

        let record = posts.get_by_link("https://example.com/1").await.unwrap().unwrap();
        assert_eq!(record.pin_days, 2);
    }

    #[tokio::test]
    async fn test_advance_new_day_decrements_featured_only() {
        let db = Database::open_in_memory().await.unwrap();
        let posts = PostRepository::new(db.pool());
        posts.try_insert("https://example.com/pinned", 2).await.unwrap();
        posts.try_insert("https://example.com/plain", 0).await.unwrap();

        let clock = DayClockRepository::new(db.pool());
        assert_eq!(clock.advance(3).await.unwrap(), Some(1));
        assert_eq!(clock.last_day().await.unwrap(), 3);

        let pinned = posts.get_by_link("https://example.com/pinned").await.unwrap().unwrap();
        assert_eq!(pinned.pin_days, 1);
        let plain = posts.get_by_link("https://example.com/plain").await.unwrap().unwrap();
        assert_eq!(plain.pin_days, 0);

        assert_eq!(clock.advance(3).await.unwrap(), None);
        let pinned = posts.get_by_link("https://example.com/pinned").await.unwrap().unwrap();
        assert_eq!(pinned.pin_days, 1);
    }

    #[tokio::test]
    async fn test_advance_floors_at_zero() {
        let db = Database::open_in_memory().await.unwrap();
        let posts = PostRepository::new(db.pool());
        posts.try_insert("https://example.com/1", 1).await.unwrap();

        let clock = DayClockRepository::new(db.pool());
        clock.advance(1).await.unwrap();
        clock.advance(2).await.unwrap();

        let record = posts.get_by_link("https://example.com/1").await.unwrap().unwrap();
        assert_eq!(record.pin_days, 0);
        assert!(record.featured);
    }
}
