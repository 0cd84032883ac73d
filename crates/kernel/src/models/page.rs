//! Page model and row-level queries.
//!
//! Pages are the content records of Lamprey. Every query here takes a sqlx
//! executor so the same statements run against the pool or inside a
//! transaction opened by [`crate::store::PageStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite};

/// Columns selected for every page read, in [`Page`] field order.
const PAGE_COLUMNS: &str = "id, title, created_at, updated_at, content, data, deleted";

/// Page record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    /// Monotonically assigned identifier.
    pub id: i64,

    /// Human-readable title, unique among live pages.
    pub title: String,

    /// When the page was created.
    pub created_at: DateTime<Utc>,

    /// When the page was last mutated.
    pub updated_at: DateTime<Utc>,

    /// Article body.
    pub content: String,

    /// Opaque structured payload; `None` when the page carries no data.
    pub data: Option<Vec<u8>>,

    /// Soft-delete flag.
    pub deleted: bool,
}

/// Listing entry for the page index.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PageSummary {
    pub id: i64,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Data payload as text, for editors and logs.
    pub fn data_text(&self) -> String {
        self.data
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    /// Find a live page by ID.
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE id = ? AND deleted = 0"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Find a live page by title.
    pub async fn find_by_title<'e, E>(
        executor: E,
        title: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE title = ? AND deleted = 0"
        ))
        .bind(title)
        .fetch_optional(executor)
        .await
    }

    /// List live pages ordered by title.
    pub async fn list_live<'e, E>(executor: E) -> Result<Vec<PageSummary>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PageSummary>(
            "SELECT id, title, updated_at FROM pages WHERE deleted = 0 ORDER BY title",
        )
        .fetch_all(executor)
        .await
    }

    /// Whether a live page other than `except` already uses `title`.
    pub async fn title_taken<'e, E>(
        executor: E,
        title: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pages WHERE title = ? AND deleted = 0 AND id != ?",
        )
        .bind(title)
        .bind(except.unwrap_or(0))
        .fetch_one(executor)
        .await?;

        Ok(count > 0)
    }

    /// Insert a new page and return its ID.
    ///
    /// Both timestamps are set to `now`.
    pub async fn insert<'e, E>(
        executor: E,
        title: &str,
        content: &str,
        data: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO pages (title, created_at, updated_at, content, data, deleted)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(title)
        .bind(now)
        .bind(now)
        .bind(content)
        .bind(data)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Take the database write lock for a live page without changing it.
    ///
    /// Meant as the first statement of a write transaction. Returns the
    /// number of rows matched (0 when the page is missing or deleted).
    pub async fn lock_live<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE pages SET deleted = deleted WHERE id = ? AND deleted = 0")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Overwrite title, content and data of a live page.
    ///
    /// Returns the number of rows changed (0 when the page is missing or deleted).
    pub async fn overwrite<'e, E>(
        executor: E,
        id: i64,
        title: &str,
        content: &str,
        data: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE pages SET
                title = ?,
                content = ?,
                data = ?,
                updated_at = ?
            WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(data)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Replace the article body of a live page, leaving title and data alone.
    pub async fn set_content<'e, E>(
        executor: E,
        id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE pages SET content = ?, updated_at = ? WHERE id = ? AND deleted = 0")
                .bind(content)
                .bind(now)
                .bind(id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected())
    }

    /// Replace the data payload of a live page, leaving title and content alone.
    pub async fn set_data<'e, E>(
        executor: E,
        id: i64,
        data: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE pages SET data = ?, updated_at = ? WHERE id = ? AND deleted = 0")
                .bind(data)
                .bind(now)
                .bind(id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected())
    }

    /// Set the soft-delete flag. Already-deleted or unknown pages are left alone.
    pub async fn mark_deleted<'e, E>(
        executor: E,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE pages SET deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0")
                .bind(now)
                .bind(id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn page(data: Option<&[u8]>) -> Page {
        let now = Utc::now();
        Page {
            id: 1,
            title: "Home".to_string(),
            created_at: now,
            updated_at: now,
            content: "Hello".to_string(),
            data: data.map(<[u8]>::to_vec),
            deleted: false,
        }
    }

    #[test]
    fn data_text_of_missing_payload_is_empty() {
        assert_eq!(page(None).data_text(), "");
    }

    #[test]
    fn data_text_is_lossy_utf8() {
        assert_eq!(page(Some(br#"{"a":1}"#)).data_text(), r#"{"a":1}"#);
        assert_eq!(page(Some(&[0x66, 0xff])).data_text(), "f\u{fffd}");
    }
}
