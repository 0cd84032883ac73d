#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every test gets its own [`Scratch`] directory holding an SQLite database
//! file and a deployment folder, so tests never share state and can run in
//! parallel.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lamprey_kernel::deploy::FolderDeployer;
use lamprey_kernel::{ArticleRenderer, DeployError, Deployer, Page, PageStore, StoreConfig};
use lamprey_test_utils::Scratch;

/// Open a store on the scratch database.
pub async fn open_store(scratch: &Scratch) -> PageStore {
    PageStore::open(&StoreConfig {
        database_url: scratch.database_url(),
        max_connections: 5,
    })
    .await
    .expect("failed to open page store")
}

/// Renderer with the built-in templates.
pub fn renderer() -> Arc<ArticleRenderer> {
    Arc::new(ArticleRenderer::builtin().expect("built-in templates must parse"))
}

/// Folder deployer writing into the scratch deploy directory.
pub fn folder_deployer(scratch: &Scratch) -> FolderDeployer {
    FolderDeployer::new(scratch.deploy_dir(), renderer())
}

/// Deployer that counts calls and always fails with a write error.
#[derive(Default)]
pub struct FailingDeployer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Deployer for FailingDeployer {
    async fn deploy_article(&self, _page: &Page) -> Result<(), DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DeployError::TargetWrite {
            target: "unreachable".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        })
    }

    async fn deploy_data(&self, page: &Page) -> Result<(), DeployError> {
        self.deploy_article(page).await
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Deployer that sleeps before succeeding.
pub struct SlowDeployer {
    pub delay: Duration,
}

#[async_trait]
impl Deployer for SlowDeployer {
    async fn deploy_article(&self, _page: &Page) -> Result<(), DeployError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn deploy_data(&self, _page: &Page) -> Result<(), DeployError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Deployer that records which page IDs it published.
#[derive(Default)]
pub struct RecordingDeployer {
    pub articles: IdLog,
    pub data: IdLog,
}

#[async_trait]
impl Deployer for RecordingDeployer {
    async fn deploy_article(&self, page: &Page) -> Result<(), DeployError> {
        self.articles.push(page.id);
        Ok(())
    }

    async fn deploy_data(&self, page: &Page) -> Result<(), DeployError> {
        self.data.push(page.id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Append-only list of page IDs.
#[derive(Default)]
pub struct IdLog(Mutex<Vec<i64>>);

impl IdLog {
    pub fn push(&self, id: i64) {
        self.0.lock().unwrap().push(id);
    }

    pub fn snapshot(&self) -> Vec<i64> {
        self.0.lock().unwrap().clone()
    }
}
