//! Page store.
//!
//! [`PageStore`] is the durable source of truth for pages and their revision
//! history. It is opened once at startup, shared by cloning (the pool is
//! reference counted), and closed once at shutdown.

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::db;
use crate::models::{Page, PageSummary, Revision};

/// Page store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("page not found")]
    NotFound,

    #[error("a page titled {0:?} already exists")]
    Conflict(String),

    #[error("page title must not be empty")]
    InvalidTitle,

    #[error("page store is closed")]
    Closed,

    #[error("storage error")]
    Storage(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolClosed => StoreError::Closed,
            other => StoreError::Storage(other),
        }
    }
}

/// Map a write failure, turning a violation of the live-title index into a conflict.
fn write_error(e: sqlx::Error, title: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(title.to_string());
    }
    StoreError::from(e)
}

fn validate_title(title: &str) -> Result<&str, StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::InvalidTitle);
    }
    Ok(title)
}

/// Single column changed by a partial update.
#[derive(Clone, Copy)]
enum Field<'a> {
    Content(&'a str),
    Data(Option<&'a [u8]>),
}

impl Field<'_> {
    fn name(self) -> &'static str {
        match self {
            Field::Content(_) => "content",
            Field::Data(_) => "data",
        }
    }
}

/// Connection settings for [`PageStore::open`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite connection URL, e.g. `sqlite://lamprey.db`.
    pub database_url: String,

    /// Maximum connections in the pool.
    pub max_connections: u32,
}

/// Handle to the page and revision tables.
#[derive(Clone)]
pub struct PageStore {
    pool: SqlitePool,
}

impl PageStore {
    /// Open the database and make sure the schema exists.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = db::create_pool(&config.database_url, config.max_connections).await?;
        db::apply_schema(&pool).await?;
        info!(url = %config.database_url, "page store opened");
        Ok(Self { pool })
    }

    /// Wrap an existing pool. The schema must already be applied.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> Result<&SqlitePool, StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(&self.pool)
    }

    /// Create a page and return its ID.
    pub async fn create_page(
        &self,
        title: &str,
        content: &str,
        data: Option<&[u8]>,
    ) -> Result<i64, StoreError> {
        let title = validate_title(title)?;
        let pool = self.pool()?;
        let now = Utc::now();

        // The live-title index rejects duplicates.
        let id = Page::insert(pool, title, content, data, now)
            .await
            .map_err(|e| write_error(e, title))?;

        info!(page_id = id, title = %title, "page created");
        Ok(id)
    }

    /// Look up a page by ID when `id_or_title` parses as an integer, by title otherwise.
    ///
    /// A page whose title is itself numeric is only reachable through
    /// [`PageStore::get_page_by_title`].
    pub async fn get_page(&self, id_or_title: &str) -> Result<Page, StoreError> {
        match id_or_title.parse::<i64>() {
            Ok(id) => self.get_page_by_id(id).await,
            Err(_) => self.get_page_by_title(id_or_title).await,
        }
    }

    /// Get a live page by ID.
    pub async fn get_page_by_id(&self, id: i64) -> Result<Page, StoreError> {
        Page::find_by_id(self.pool()?, id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Get a live page by title.
    pub async fn get_page_by_title(&self, title: &str) -> Result<Page, StoreError> {
        Page::find_by_title(self.pool()?, title)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// List live pages ordered by title.
    pub async fn list_pages(&self) -> Result<Vec<PageSummary>, StoreError> {
        Ok(Page::list_live(self.pool()?).await?)
    }

    /// Replace a page's title, content and data, keeping the old content as a revision.
    ///
    /// Everything runs in one transaction whose first statement takes the
    /// database write lock, so the content captured as the revision is the
    /// content the update replaces and concurrent updates of the same page
    /// are applied one after the other. Timestamps are taken under the lock
    /// and follow commit order.
    pub async fn update_page(
        &self,
        id: i64,
        title: &str,
        content: &str,
        data: Option<&[u8]>,
    ) -> Result<(), StoreError> {
        let title = validate_title(title)?;
        let pool = self.pool()?;

        let mut tx = pool.begin().await?;

        if Page::lock_live(&mut *tx, id).await? == 0 {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();

        let Some(revision_id) = Revision::capture_current(&mut *tx, id, now).await? else {
            return Err(StoreError::NotFound);
        };

        if Page::title_taken(&mut *tx, title, Some(id)).await? {
            return Err(StoreError::Conflict(title.to_string()));
        }

        let changed = Page::overwrite(&mut *tx, id, title, content, data, now)
            .await
            .map_err(|e| write_error(e, title))?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;

        debug!(page_id = id, revision_id, "revision recorded");
        info!(page_id = id, title = %title, "page updated");
        Ok(())
    }

    /// Replace only the article body, keeping the old body as a revision.
    ///
    /// Title and data are left as they are at commit time, so a concurrent
    /// [`PageStore::update_data`] is never undone. Returns the page as committed.
    pub async fn update_content(&self, id: i64, content: &str) -> Result<Page, StoreError> {
        self.update_field(id, Field::Content(content)).await
    }

    /// Replace only the data payload, keeping the current body as a revision.
    ///
    /// Returns the page as committed.
    pub async fn update_data(&self, id: i64, data: Option<&[u8]>) -> Result<Page, StoreError> {
        self.update_field(id, Field::Data(data)).await
    }

    async fn update_field(&self, id: i64, field: Field<'_>) -> Result<Page, StoreError> {
        let pool = self.pool()?;

        let mut tx = pool.begin().await?;

        if Page::lock_live(&mut *tx, id).await? == 0 {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();

        let Some(revision_id) = Revision::capture_current(&mut *tx, id, now).await? else {
            return Err(StoreError::NotFound);
        };

        let changed = match field {
            Field::Content(content) => Page::set_content(&mut *tx, id, content, now).await?,
            Field::Data(data) => Page::set_data(&mut *tx, id, data, now).await?,
        };
        if changed == 0 {
            return Err(StoreError::NotFound);
        }

        let page = Page::find_by_id(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound)?;

        tx.commit().await?;

        debug!(page_id = id, revision_id, "revision recorded");
        info!(page_id = id, field = field.name(), "page updated");
        Ok(page)
    }

    /// Soft-delete a page. Deleting twice, or deleting an unknown ID, is not an error.
    pub async fn delete_page(&self, id: i64) -> Result<(), StoreError> {
        let changed = Page::mark_deleted(self.pool()?, id, Utc::now()).await?;
        if changed > 0 {
            info!(page_id = id, "page deleted");
        }
        Ok(())
    }

    /// Append a revision for a page directly.
    pub async fn record_revision(
        &self,
        page_id: i64,
        previous_content: &str,
    ) -> Result<i64, StoreError> {
        Ok(Revision::record(self.pool()?, page_id, previous_content, Utc::now()).await?)
    }

    /// Revision history of a page, oldest first. Soft-deleted pages keep theirs.
    pub async fn list_revisions(&self, page_id: i64) -> Result<Vec<Revision>, StoreError> {
        Ok(Revision::list_for_page(self.pool()?, page_id).await?)
    }

    /// Get a single revision.
    pub async fn get_revision(&self, id: i64) -> Result<Revision, StoreError> {
        Revision::find_by_id(self.pool()?, id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Check if the database connection is healthy.
    pub async fn check_health(&self) -> bool {
        match self.pool() {
            Ok(pool) => db::check_health(pool).await,
            Err(_) => false,
        }
    }

    /// Close the pool. Later operations fail with [`StoreError::Closed`].
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("page store closed");
        }
    }

    /// Whether [`PageStore::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl std::fmt::Debug for PageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStore")
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}
