//! Post record repository.
//!
//! A post record exists for every link the bot has accepted. It doubles as
//! the dedup set and as the pin lifecycle state.

use super::DbPool;
use crate::posting::ExternalPostId;
use crate::{FeedpinError, Result};

/// Persistent state for one accepted link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    /// Row ID.
    pub id: i64,
    /// Item link (unique).
    pub link: String,
    /// Remaining days to stay featured.
    pub pin_days: i64,
    /// External post id, once the bot's own post has been observed.
    pub external_post_id: Option<ExternalPostId>,
    /// Whether the post should currently be featured.
    pub featured: bool,
}

/// Result of a dedup insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The link was new and a record was created.
    Inserted,
    /// The link was already known; nothing changed.
    AlreadyPresent,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: i64,
    link: String,
    pin_days: i64,
    post_id: Option<i64>,
    featured: bool,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        PostRecord {
            id: row.id,
            link: row.link,
            pin_days: row.pin_days,
            external_post_id: row.post_id.map(ExternalPostId),
            featured: row.featured,
        }
    }
}

/// Repository for post record operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a record for `link` unless one already exists.
    ///
    /// The record starts featured iff `pin_days > 0`.
    pub async fn try_insert(&self, link: &str, pin_days: i64) -> Result<InsertOutcome> {
        if link.is_empty() {
            return Err(FeedpinError::Validation("link must not be empty".into()));
        }
        if pin_days < 0 {
            return Err(FeedpinError::Validation(format!(
                "pin days must not be negative: {}",
                pin_days
            )));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO posts (link, pin_days, featured)
            VALUES ($1, $2, $3)
            ON CONFLICT(link) DO NOTHING
            "#,
        )
        .bind(link)
        .bind(pin_days)
        .bind(pin_days > 0)
        .execute(self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyPresent)
        }
    }

    /// Get a record by link.
    pub async fn get_by_link(&self, link: &str) -> Result<Option<PostRecord>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, link, pin_days, post_id, featured
            FROM posts
            WHERE link = $1
            "#,
        )
        .bind(link)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(PostRecord::from))
    }

    /// Set the external post id if none is recorded yet.
    ///
    /// An existing id is never overwritten. Returns the record as it stands
    /// after the update, or `None` if the link is unknown.
    pub async fn record_external_id(
        &self,
        link: &str,
        post_id: ExternalPostId,
    ) -> Result<Option<PostRecord>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE posts SET post_id = $1 WHERE link = $2 AND post_id IS NULL")
            .bind(post_id.0)
            .bind(link)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, link, pin_days, post_id, featured
            FROM posts
            WHERE link = $1
            "#,
        )
        .bind(link)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.map(PostRecord::from))
    }

    /// List featured records whose pin time has run out.
    pub async fn list_expired(&self) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, link, pin_days, post_id, featured
            FROM posts
            WHERE pin_days = 0 AND featured = 1
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    /// List all featured records.
    pub async fn list_featured(&self) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, link, pin_days, post_id, featured
            FROM posts
            WHERE featured = 1
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    /// Move an expired record to its terminal state.
    ///
    /// Only records with no pin days left are affected.
    pub async fn unfeature(&self, link: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET featured = 0 WHERE link = $1 AND featured = 1 AND pin_days = 0",
        )
        .bind(link)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all records.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count featured records.
    pub async fn count_featured(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE featured = 1")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_try_insert_new_link() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());

        let outcome = repo.try_insert("https://example.com/1", 3).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        let record = repo.get_by_link("https://example.com/1").await.unwrap().unwrap();
        assert_eq!(record.pin_days, 3);
        assert!(record.featured);
        assert!(record.external_post_id.is_none());
    }

    #[tokio::test]
    async fn test_try_insert_without_pin_is_not_featured() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());

        repo.try_insert("https://example.com/1", 0).await.unwrap();
        let record = repo.get_by_link("https://example.com/1").await.unwrap().unwrap();
        assert_eq!(record.pin_days, 0);
        assert!(!record.featured);
    }

    #[tokio::test]
    async fn test_try_insert_duplicate_is_noop() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());

        repo.try_insert("https://example.com/1", 3).await.unwrap();
        let outcome = repo.try_insert("https://example.com/1", 9).await.unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyPresent);

        let record = repo.get_by_link("https://example.com/1").await.unwrap().unwrap();
        assert_eq!(record.pin_days, 3);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_try_insert_rejects_invalid_input() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());

        assert!(matches!(
            repo.try_insert("", 1).await,
            Err(FeedpinError::Validation(_))
        ));
        assert!(matches!(
            repo.try_insert("https://example.com/1", -1).await,
            Err(FeedpinError::Validation(_))
        ));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_external_id_only_narrows() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());
        repo.try_insert("https://example.com/1", 2).await.unwrap();

        let record = repo
            .record_external_id("https://example.com/1", ExternalPostId(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.external_post_id, Some(ExternalPostId(10)));

        let record = repo
            .record_external_id("https://example.com/1", ExternalPostId(11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.external_post_id, Some(ExternalPostId(10)));
    }

    #[tokio::test]
    async fn test_record_external_id_unknown_link() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());

        let record = repo
            .record_external_id("https://example.com/missing", ExternalPostId(1))
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_list_expired_and_unfeature() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());
        repo.try_insert("https://example.com/1", 1).await.unwrap();
        repo.try_insert("https://example.com/2", 0).await.unwrap();

        sqlx::query("UPDATE posts SET pin_days = 0 WHERE link = 'https://example.com/1'")
            .execute(db.pool())
            .await
            .unwrap();

        let expired = repo.list_expired().await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].link, "https://example.com/1");

        assert!(repo.unfeature("https://example.com/1").await.unwrap());
        assert!(!repo.unfeature("https://example.com/1").await.unwrap());
        assert!(repo.list_expired().await.unwrap().is_empty());
        assert_eq!(repo.count_featured().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unfeature_ignores_records_with_days_left() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());
        repo.try_insert("https://example.com/1", 2).await.unwrap();

        assert!(!repo.unfeature("https://example.com/1").await.unwrap());
        assert_eq!(repo.list_featured().await.unwrap().len(), 1);
    }
}
