//! Local folder deployment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use super::order::{InstallOrder, Ticket};
use super::{DeployError, Deployer, artifact_name, data_artifact};
use crate::models::Page;
use crate::theme::ArticleRenderer;

/// Writes artifacts into a directory on the local filesystem.
///
/// Each artifact is written to a temporary file next to its target and then
/// renamed over it, so readers see either the old or the new document and a
/// shorter document never leaves stale trailing bytes behind.
pub struct FolderDeployer {
    root: PathBuf,
    renderer: Arc<ArticleRenderer>,
    order: InstallOrder,
}

impl FolderDeployer {
    /// Create a deployer writing into `root` (created on first write).
    pub fn new(root: impl Into<PathBuf>, renderer: Arc<ArticleRenderer>) -> Self {
        Self {
            root: root.into(),
            renderer,
            order: InstallOrder::default(),
        }
    }

    /// Directory artifacts are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn publish(&self, name: &str, bytes: Vec<u8>) -> Result<PathBuf, DeployError> {
        let target = self.root.join(name);
        let ticket = self.order.ticket(name).await;
        let tmp = self
            .root
            .join(format!(".{name}.{}.tmp", Uuid::now_v7().simple()));

        // Runs detached: a caller giving up must not stop it between the
        // write and the rename and leave the temp file behind.
        let task = tokio::spawn(install(self.root.clone(), tmp, target.clone(), bytes, ticket));
        let installed = task.await.map_err(|e| {
            DeployError::write(target.display().to_string(), std::io::Error::other(e))
        })??;

        if installed {
            debug!(path = ?target, "artifact written");
        } else {
            debug!(path = ?target, "artifact superseded by a newer deployment");
        }
        Ok(target)
    }
}

async fn install(
    root: PathBuf,
    tmp: PathBuf,
    target: PathBuf,
    bytes: Vec<u8>,
    ticket: Ticket,
) -> Result<bool, DeployError> {
    let target_str = target.display().to_string();

    fs::create_dir_all(&root)
        .await
        .map_err(|e| DeployError::write(root.display().to_string(), e))?;

    if let Err(e) = write_file(&tmp, &bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(DeployError::write(target_str, e));
    }

    let installed = ticket.install(fs::rename(&tmp, &target)).await;
    if !matches!(installed, Ok(true)) {
        let _ = fs::remove_file(&tmp).await;
    }
    installed.map_err(|e| DeployError::write(target_str, e))
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[async_trait]
impl Deployer for FolderDeployer {
    async fn deploy_article(&self, page: &Page) -> Result<(), DeployError> {
        let name = artifact_name(&page.title, "html")?;
        let html = self.renderer.render_article(page)?;
        let path = self.publish(&name, html.into_bytes()).await?;
        info!(page_id = page.id, path = ?path, "article deployed");
        Ok(())
    }

    async fn deploy_data(&self, page: &Page) -> Result<(), DeployError> {
        let name = artifact_name(&page.title, "json")?;
        let path = self.publish(&name, data_artifact(page).to_vec()).await?;
        info!(page_id = page.id, path = ?path, "data deployed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "folder"
    }
}

impl std::fmt::Debug for FolderDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderDeployer")
            .field("root", &self.root)
            .finish()
    }
}
