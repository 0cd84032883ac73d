//! Application state shared across all handlers.

use std::sync::Arc;

use crate::content::PageService;
use crate::store::PageStore;
use crate::theme::ArticleRenderer;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Page mutations and deployment.
    pages: PageService,

    /// Templates for the editor views.
    renderer: Arc<ArticleRenderer>,

    /// Path prefix of the editor routes ("" or e.g. "/lamprey").
    prefix: String,
}

impl AppState {
    pub fn new(pages: PageService, renderer: Arc<ArticleRenderer>, prefix: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pages,
                renderer,
                prefix: prefix.into(),
            }),
        }
    }

    pub fn pages(&self) -> &PageService {
        &self.inner.pages
    }

    pub fn store(&self) -> &PageStore {
        self.inner.pages.store()
    }

    pub fn renderer(&self) -> &ArticleRenderer {
        &self.inner.renderer
    }

    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// Path of the page index under the prefix.
    pub fn index_path(&self) -> String {
        if self.inner.prefix.is_empty() {
            "/".to_string()
        } else {
            self.inner.prefix.clone()
        }
    }

    /// Check if the database is reachable.
    pub async fn database_healthy(&self) -> bool {
        self.store().check_health().await
    }
}
