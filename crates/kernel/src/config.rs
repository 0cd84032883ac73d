//! Configuration loaded from environment variables.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::store::StoreConfig;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no deployment target configured: set DEPLOY_FOLDER or DEPLOY_SSH_HOST")]
    NoDeployTarget,

    #[error("more than one deployment target configured: set only one of DEPLOY_FOLDER and DEPLOY_SSH_HOST")]
    MultipleDeployTargets,

    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("SSH deployment requested but this build lacks the `ssh` feature")]
    SshUnavailable,
}

/// Remote host settings for SSH deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Private key used for authentication.
    pub key_file: PathBuf,
    /// Directory on the remote host that receives the artifacts.
    pub remote_dir: String,
}

/// The one place deployed artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployTarget {
    /// A directory on the local filesystem.
    Folder { path: PathBuf },
    /// A directory on a remote host, over SSH/SFTP.
    Ssh(SshTarget),
}

impl DeployTarget {
    /// Local directory holding the artifacts, if deployment is local.
    pub fn local_folder(&self) -> Option<&Path> {
        match self {
            DeployTarget::Folder { path } => Some(path.as_path()),
            DeployTarget::Ssh(_) => None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener address (default: 127.0.0.1:8080).
    pub http_address: String,

    /// Page store settings.
    pub store: StoreConfig,

    /// Directory with `*.html` templates; built-ins when unset.
    pub templates_dir: Option<PathBuf>,

    /// Upper bound on a single deployment (default: 30s).
    pub deploy_timeout: Duration,

    /// Where pages are deployed.
    pub deploy_target: DeployTarget,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_address = var("HTTP_ADDRESS").unwrap_or_else(|| "127.0.0.1:8080".to_string());

        let database_url = var("DATABASE_URL").unwrap_or_else(|| "sqlite://lamprey.db".to_string());

        let max_connections = parse_or(var("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 5u32)?;

        let templates_dir = var("TEMPLATES_DIR").map(PathBuf::from);

        let deploy_timeout = Duration::from_secs(parse_or(
            var("DEPLOY_TIMEOUT_SECS"),
            "DEPLOY_TIMEOUT_SECS",
            30u64,
        )?);

        let folder = var("DEPLOY_FOLDER").map(PathBuf::from);
        let ssh = match var("DEPLOY_SSH_HOST") {
            Some(host) => Some(SshTarget {
                host,
                port: parse_or(var("DEPLOY_SSH_PORT"), "DEPLOY_SSH_PORT", 22u16)?,
                user: var("DEPLOY_SSH_USER").ok_or(ConfigError::Missing("DEPLOY_SSH_USER"))?,
                key_file: var("DEPLOY_SSH_KEY_FILE")
                    .map(PathBuf::from)
                    .ok_or(ConfigError::Missing("DEPLOY_SSH_KEY_FILE"))?,
                remote_dir: var("DEPLOY_SSH_PATH").unwrap_or_else(|| ".".to_string()),
            }),
            None => None,
        };

        let deploy_target = match (folder, ssh) {
            (Some(path), None) => DeployTarget::Folder { path },
            (None, Some(target)) => DeployTarget::Ssh(target),
            (None, None) => return Err(ConfigError::NoDeployTarget),
            (Some(_), Some(_)) => return Err(ConfigError::MultipleDeployTargets),
        };

        Ok(Self {
            http_address,
            store: StoreConfig {
                database_url,
                max_connections,
            },
            templates_dir,
            deploy_timeout,
            deploy_target,
        })
    }

    /// Path prefix for the editor routes.
    ///
    /// With folder deployment the server also serves the deployed files from
    /// `/`, so the editor moves under `/lamprey`.
    pub fn route_prefix(&self) -> &'static str {
        match self.deploy_target {
            DeployTarget::Folder { .. } => "/lamprey",
            DeployTarget::Ssh(_) => "",
        }
    }
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
