//! Remote folder deployment over SSH/SFTP.

use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ssh2::{ErrorCode, RenameFlags, Session};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::order::{InstallOrder, Ticket};
use super::{DeployError, Deployer, artifact_name, data_artifact};
use crate::config::SshTarget;
use crate::models::Page;
use crate::theme::ArticleRenderer;

/// Bound on establishing the TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on each blocking libssh2 call, in milliseconds.
const SESSION_TIMEOUT_MS: u32 = 30_000;

/// SFTP status codes servers answer with when a rename would overwrite.
const SSH_FX_FAILURE: i32 = 4;
const SSH_FX_FILE_ALREADY_EXISTS: i32 = 11;

/// Writes artifacts into a directory on a remote host reached over SSH.
///
/// Authentication uses a private key file. Every upload opens its own
/// session on the blocking thread pool, writes a uniquely named temp file and
/// renames it over the target, so a failed transfer never leaves a
/// half-written or missing artifact.
pub struct SshDeployer {
    target: SshTarget,
    renderer: Arc<ArticleRenderer>,
    order: InstallOrder,
}

impl SshDeployer {
    pub fn new(target: SshTarget, renderer: Arc<ArticleRenderer>) -> Self {
        Self {
            target,
            renderer,
            order: InstallOrder::default(),
        }
    }

    /// Remote path of an artifact.
    fn remote_path(&self, name: &str) -> PathBuf {
        remote_join(&self.target.remote_dir, name)
    }

    async fn publish(&self, name: String, bytes: Vec<u8>) -> Result<(), DeployError> {
        let target = self.target.clone();
        let label = format!(
            "{}@{}:{}",
            target.user,
            target.host,
            self.remote_path(&name).display()
        );

        let ticket = self.order.ticket(&name).await;

        let result = tokio::task::spawn_blocking(move || upload(&target, &name, &bytes, ticket))
            .await
            .map_err(io::Error::other)
            .and_then(|inner| inner);

        match result {
            Ok(true) => {
                debug!(target = %label, "artifact uploaded");
                Ok(())
            }
            Ok(false) => {
                debug!(target = %label, "artifact superseded by a newer deployment");
                Ok(())
            }
            Err(e) => {
                warn!(target = %label, error = %e, "upload failed");
                Err(DeployError::write(label, e))
            }
        }
    }
}

fn remote_join(dir: &str, name: &str) -> PathBuf {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        PathBuf::from(format!("/{name}"))
    } else {
        PathBuf::from(format!("{dir}/{name}"))
    }
}

fn connect(target: &SshTarget) -> io::Result<Session> {
    let addr = (target.host.as_str(), target.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("could not resolve {}", target.host),
            )
        })?;
    let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout(SESSION_TIMEOUT_MS);
    session.handshake()?;
    session.userauth_pubkey_file(&target.user, None, &target.key_file, None)?;
    if !session.authenticated() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("key authentication failed for {}", target.user),
        ));
    }
    Ok(session)
}

/// Hidden, collision-free sibling name for `name`.
fn scratch_name(name: &str, suffix: &str) -> String {
    format!(".{name}.{}.{suffix}", Uuid::now_v7().simple())
}

fn upload(target: &SshTarget, name: &str, bytes: &[u8], ticket: Ticket) -> io::Result<bool> {
    let session = connect(target)?;
    let sftp = session.sftp()?;

    let final_path = remote_join(&target.remote_dir, name);
    let tmp_path = remote_join(&target.remote_dir, &scratch_name(name, "tmp"));

    if let Err(e) = write_remote(&sftp, &tmp_path, bytes) {
        let _ = sftp.unlink(&tmp_path);
        return Err(e);
    }

    let installed = ticket.install_blocking(|| {
        let backup = remote_join(&target.remote_dir, &scratch_name(name, "old"));
        swap_into_place(&sftp, &tmp_path, &final_path, &backup)
    });
    if !matches!(installed, Ok(true)) {
        let _ = sftp.unlink(&tmp_path);
    }
    installed
}

/// Rename `tmp` over `target`.
///
/// Servers that refuse to overwrite get the live artifact moved to `backup`
/// first; it is moved back if the second rename fails, so the target is
/// never left missing.
fn swap_into_place(sftp: &ssh2::Sftp, tmp: &Path, target: &Path, backup: &Path) -> io::Result<()> {
    let flags = RenameFlags::OVERWRITE | RenameFlags::ATOMIC | RenameFlags::NATIVE;
    match sftp.rename(tmp, target, Some(flags)) {
        Ok(()) => Ok(()),
        Err(e) if refused_overwrite(&e) => {
            sftp.rename(target, backup, None)?;
            if let Err(e) = sftp.rename(tmp, target, None) {
                let _ = sftp.rename(backup, target, None);
                return Err(e.into());
            }
            let _ = sftp.unlink(backup);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Whether a failed rename means "target exists" rather than a real fault.
///
/// SFTPv3 has no overwrite flag; servers answer with a generic failure or,
/// on newer protocol versions, with file-already-exists.
fn refused_overwrite(e: &ssh2::Error) -> bool {
    matches!(
        e.code(),
        ErrorCode::SFTP(SSH_FX_FAILURE | SSH_FX_FILE_ALREADY_EXISTS)
    )
}

fn write_remote(sftp: &ssh2::Sftp, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = sftp.create(path)?;
    file.write_all(bytes)?;
    file.flush()
}

#[async_trait]
impl Deployer for SshDeployer {
    async fn deploy_article(&self, page: &Page) -> Result<(), DeployError> {
        let name = artifact_name(&page.title, "html")?;
        let html = self.renderer.render_article(page)?;
        let path = self.remote_path(&name).display().to_string();
        self.publish(name, html.into_bytes()).await?;
        info!(page_id = page.id, host = %self.target.host, path = %path, "article deployed");
        Ok(())
    }

    async fn deploy_data(&self, page: &Page) -> Result<(), DeployError> {
        let name = artifact_name(&page.title, "json")?;
        let path = self.remote_path(&name).display().to_string();
        self.publish(name, data_artifact(page).to_vec()).await?;
        info!(page_id = page.id, host = %self.target.host, path = %path, "data deployed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ssh"
    }
}

impl std::fmt::Debug for SshDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshDeployer")
            .field("host", &self.target.host)
            .field("port", &self.target.port)
            .field("user", &self.target.user)
            .field("remote_dir", &self.target.remote_dir)
            .finish()
    }
}
