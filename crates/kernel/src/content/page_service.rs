//! Page service: store mutations followed by deployment.
//!
//! The store is the durable source of truth. Deployment runs only after a
//! mutation has committed, is bounded by a timeout, and never rolls the
//! mutation back. A failed deployment is reported as
//! [`PublishError::Deploy`] so callers can retry it alone with
//! [`PageService::redeploy`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::deploy::{DeployError, Deployer};
use crate::models::Page;
use crate::store::{PageStore, StoreError};

/// Errors from a mutate-then-deploy operation.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The store rejected the mutation; nothing was deployed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The mutation committed but publishing it failed.
    #[error("page {} was saved but deployment failed", page.id)]
    Deploy {
        page: Box<Page>,
        #[source]
        source: DeployError,
    },
}

/// Which artifacts of a page to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifacts {
    Article,
    Data,
    Both,
}

impl Artifacts {
    fn article(self) -> bool {
        matches!(self, Artifacts::Article | Artifacts::Both)
    }

    fn data(self) -> bool {
        matches!(self, Artifacts::Data | Artifacts::Both)
    }
}

/// Service for page mutations with deployment.
#[derive(Clone)]
pub struct PageService {
    inner: Arc<PageServiceInner>,
}

struct PageServiceInner {
    store: PageStore,
    deployer: Arc<dyn Deployer>,
    deploy_timeout: Duration,
}

impl PageService {
    /// Create a new page service.
    pub fn new(store: PageStore, deployer: Arc<dyn Deployer>, deploy_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(PageServiceInner {
                store,
                deployer,
                deploy_timeout,
            }),
        }
    }

    /// The underlying store, for reads.
    pub fn store(&self) -> &PageStore {
        &self.inner.store
    }

    /// The configured deployer.
    pub fn deployer(&self) -> &Arc<dyn Deployer> {
        &self.inner.deployer
    }

    /// Create a page and publish its article and data.
    pub async fn create_and_deploy(
        &self,
        title: &str,
        content: &str,
        data: Option<&[u8]>,
    ) -> Result<Page, PublishError> {
        let store = self.store();
        let id = store.create_page(title, content, data).await?;
        let page = store.get_page_by_id(id).await?;
        self.deploy(page, Artifacts::Both).await
    }

    /// Replace a page's content and publish the article.
    pub async fn update_article_and_deploy(
        &self,
        id_or_title: &str,
        content: &str,
    ) -> Result<Page, PublishError> {
        let store = self.store();
        let id = store.get_page(id_or_title).await?.id;
        let page = store.update_content(id, content).await?;
        self.deploy(page, Artifacts::Article).await
    }

    /// Replace a page's structured data and publish it.
    pub async fn update_data_and_deploy(
        &self,
        id_or_title: &str,
        data: Option<&[u8]>,
    ) -> Result<Page, PublishError> {
        let store = self.store();
        let id = store.get_page(id_or_title).await?.id;
        let page = store.update_data(id, data).await?;
        self.deploy(page, Artifacts::Data).await
    }

    /// Publish the current state of a page again without changing it.
    pub async fn redeploy(&self, id_or_title: &str) -> Result<Page, PublishError> {
        let page = self.store().get_page(id_or_title).await?;
        self.deploy(page, Artifacts::Both).await
    }

    /// Soft-delete a page. Published artifacts are left in place.
    pub async fn delete(&self, id_or_title: &str) -> Result<Page, PublishError> {
        let page = self.store().get_page(id_or_title).await?;
        self.store().delete_page(page.id).await?;
        Ok(page)
    }

    /// Publish `page` within the deploy timeout.
    pub async fn deploy(&self, page: Page, artifacts: Artifacts) -> Result<Page, PublishError> {
        let deployer = &self.inner.deployer;
        let limit = self.inner.deploy_timeout;

        let outcome = tokio::time::timeout(limit, async {
            if artifacts.article() {
                deployer.deploy_article(&page).await?;
            }
            if artifacts.data() {
                deployer.deploy_data(&page).await?;
            }
            Ok::<(), DeployError>(())
        })
        .await
        .unwrap_or(Err(DeployError::TimedOut(limit)));

        match outcome {
            Ok(()) => {
                info!(page_id = page.id, backend = deployer.name(), ?artifacts, "page deployed");
                Ok(page)
            }
            Err(source) => {
                warn!(
                    page_id = page.id,
                    backend = deployer.name(),
                    error = %source,
                    "deployment failed after commit"
                );
                Err(PublishError::Deploy {
                    page: Box::new(page),
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for PageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageService")
            .field("backend", &self.inner.deployer.name())
            .field("deploy_timeout", &self.inner.deploy_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_selection() {
        assert!(Artifacts::Article.article() && !Artifacts::Article.data());
        assert!(!Artifacts::Data.article() && Artifacts::Data.data());
        assert!(Artifacts::Both.article() && Artifacts::Both.data());
    }
}
