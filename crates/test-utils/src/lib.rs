//! Lamprey test utilities.
//!
//! Fixtures for integration tests: page builders and throwaway database
//! and deployment directories.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tempfile::TempDir;

/// Create a test page fixture with default values.
pub fn test_page(title: &str) -> TestPage {
    TestPage {
        title: title.to_string(),
        content: format!("<p>{title}</p>"),
        data: None,
    }
}

/// A test page builder.
#[derive(Debug, Clone)]
pub struct TestPage {
    pub title: String,
    pub content: String,
    pub data: Option<Vec<u8>>,
}

impl TestPage {
    /// Set the article body.
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    /// Attach a JSON payload.
    pub fn with_json(mut self, value: JsonValue) -> Self {
        self.data = Some(value.to_string().into_bytes());
        self
    }

    /// The payload as a borrowed slice, the shape store calls take.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

/// Scratch space for one test: a database file and a deployment folder.
///
/// Everything is removed when the value is dropped.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Create a fresh scratch directory.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Root of the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// SQLite URL of a database file inside the scratch directory.
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.path().join("lamprey.db").display())
    }

    /// Deployment folder inside the scratch directory (not created).
    pub fn deploy_dir(&self) -> PathBuf {
        self.path().join("site")
    }
}
