//! Revision model: the append-only history of page content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite};

/// Revision record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Revision {
    /// Unique identifier, assigned in commit order.
    pub id: i64,

    /// Page this revision belongs to.
    pub page_id: i64,

    /// When the revision was captured.
    pub revision_at: DateTime<Utc>,

    /// Page content immediately before the update that created this revision.
    pub previous_content: String,
}

impl Revision {
    /// Append a revision holding `previous_content`.
    pub async fn record<'e, E>(
        executor: E,
        page_id: i64,
        previous_content: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO revisions (page_id, revision_at, previous_content) VALUES (?, ?, ?)",
        )
        .bind(page_id)
        .bind(now)
        .bind(previous_content)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Append a revision holding the page's current content.
    ///
    /// Reading the content and writing the revision is a single statement.
    /// Returns `None` when the page is missing or deleted.
    pub async fn capture_current<'e, E>(
        executor: E,
        page_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO revisions (page_id, revision_at, previous_content)
            SELECT id, ?, content FROM pages WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(now)
        .bind(page_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(result.last_insert_rowid()))
    }

    /// All revisions of a page in commit order, oldest first. Includes
    /// soft-deleted pages.
    ///
    /// `revision_at` is stamped while the write lock is held, so it does not
    /// decrease along this order.
    pub async fn list_for_page<'e, E>(executor: E, page_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Revision>(
            "SELECT id, page_id, revision_at, previous_content FROM revisions WHERE page_id = ? ORDER BY id",
        )
        .bind(page_id)
        .fetch_all(executor)
        .await
    }

    /// Get a specific revision.
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Revision>(
            "SELECT id, page_id, revision_at, previous_content FROM revisions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }
}
