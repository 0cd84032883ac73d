//! Lamprey Kernel Library
//!
//! Versioned page storage with revision history, and deployment of finished
//! pages to a local folder or a remote host. The `lamprey` binary wraps this
//! library in an HTTP editor.

pub mod config;
pub mod content;
pub mod db;
pub mod deploy;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod theme;

pub use config::{Config, ConfigError, DeployTarget, SshTarget};
pub use content::{Artifacts, PageService, PublishError};
pub use deploy::{DeployError, Deployer};
pub use models::{Page, PageSummary, Revision};
pub use state::AppState;
pub use store::{PageStore, StoreConfig, StoreError};
pub use theme::ArticleRenderer;
