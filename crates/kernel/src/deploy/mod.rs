//! Deployment backends.
//!
//! A [`Deployer`] publishes a page's rendered article and its structured data
//! to a target medium. The backend is chosen once at startup from the
//! configured [`DeployTarget`] via [`from_target`].

mod folder;
mod noop;
mod order;
#[cfg(feature = "ssh")]
mod ssh;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ConfigError, DeployTarget};
use crate::models::Page;
use crate::theme::ArticleRenderer;

pub use folder::FolderDeployer;
pub use noop::NoOpDeployer;
#[cfg(feature = "ssh")]
pub use ssh::SshDeployer;

/// Longest file stem produced by [`artifact_name`].
const MAX_STEM_CHARS: usize = 200;

/// Contents written for a page without structured data.
const EMPTY_DATA: &[u8] = b"null";

/// Deployment errors.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to render article")]
    TemplateRender(#[source] tera::Error),

    #[error("failed to write {target}")]
    TargetWrite {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot derive a file name from title {0:?}")]
    PathResolution(String),

    #[error("deployment timed out after {0:?}")]
    TimedOut(Duration),
}

impl DeployError {
    pub(crate) fn write(target: impl Into<String>, source: std::io::Error) -> Self {
        DeployError::TargetWrite {
            target: target.into(),
            source,
        }
    }
}

/// Publishes pages to a deployment target.
///
/// Both operations are idempotent: deploying an unchanged page again
/// replaces the artifact with identical bytes.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Render the page and publish it as `<name>.html`.
    async fn deploy_article(&self, page: &Page) -> Result<(), DeployError>;

    /// Publish the page's structured data as `<name>.json`.
    async fn deploy_data(&self, page: &Page) -> Result<(), DeployError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Build the deployer for a configured target.
pub fn from_target(
    target: &DeployTarget,
    renderer: Arc<ArticleRenderer>,
) -> Result<Arc<dyn Deployer>, ConfigError> {
    match target {
        DeployTarget::Folder { path } => Ok(Arc::new(FolderDeployer::new(path, renderer))),
        #[cfg(feature = "ssh")]
        DeployTarget::Ssh(settings) => Ok(Arc::new(SshDeployer::new(settings.clone(), renderer))),
        #[cfg(not(feature = "ssh"))]
        DeployTarget::Ssh(_) => Err(ConfigError::SshUnavailable),
    }
}

/// File name for a page artifact: the sanitized title plus `extension`.
///
/// Alphanumerics, `-`, `_` and `.` are kept; anything else (including path
/// separators) becomes `_`. Leading dots are stripped so artifacts are never
/// hidden files, and titles with no alphanumeric character are rejected.
pub fn artifact_name(title: &str, extension: &str) -> Result<String, DeployError> {
    let mapped: String = title
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() => c,
            '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();

    let stem: String = mapped
        .trim_start_matches('.')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();

    if !stem.chars().any(char::is_alphanumeric) {
        return Err(DeployError::PathResolution(title.to_string()));
    }

    Ok(format!("{stem}.{extension}"))
}

/// Bytes published by [`Deployer::deploy_data`].
pub fn data_artifact(page: &Page) -> &[u8] {
    page.data.as_deref().unwrap_or(EMPTY_DATA)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn plain_titles_are_kept() {
        assert_eq!(artifact_name("Home", "html").unwrap(), "Home.html");
        assert_eq!(
            artifact_name("release-notes_v1.2", "json").unwrap(),
            "release-notes_v1.2.json"
        );
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(artifact_name("About Us", "html").unwrap(), "About_Us.html");
        assert_eq!(artifact_name("a/b\\c", "html").unwrap(), "a_b_c.html");
        assert_eq!(artifact_name("Über", "html").unwrap(), "Über.html");
    }

    #[test]
    fn traversal_cannot_escape_the_root() {
        let name = artifact_name("../../etc/passwd", "html").unwrap();
        assert_eq!(name, "_.._etc_passwd.html");
        assert!(!name.contains('/'));
    }

    #[test]
    fn leading_dots_are_stripped() {
        assert_eq!(artifact_name(".hidden", "html").unwrap(), "hidden.html");
    }

    #[test]
    fn titles_without_alphanumerics_are_rejected() {
        for title in ["", "...", "..", "/", " _ - "] {
            assert!(
                matches!(
                    artifact_name(title, "html"),
                    Err(DeployError::PathResolution(_))
                ),
                "title {title:?} should be rejected"
            );
        }
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = "x".repeat(500);
        let name = artifact_name(&title, "html").unwrap();
        assert_eq!(name.len(), MAX_STEM_CHARS + ".html".len());
    }

    #[test]
    fn missing_data_publishes_null() {
        let now = Utc::now();
        let mut page = Page {
            id: 1,
            title: "Home".to_string(),
            created_at: now,
            updated_at: now,
            content: String::new(),
            data: None,
            deleted: false,
        };
        assert_eq!(data_artifact(&page), b"null");

        page.data = Some(br#"{"k":"v"}"#.to_vec());
        assert_eq!(data_artifact(&page), br#"{"k":"v"}"#);
    }

    #[test]
    fn folder_target_builds_folder_deployer() {
        let renderer = Arc::new(ArticleRenderer::builtin().unwrap());
        let target = DeployTarget::Folder {
            path: "/tmp/lamprey-out".into(),
        };
        let deployer = from_target(&target, renderer).unwrap();
        assert_eq!(deployer.name(), "folder");
    }
}
