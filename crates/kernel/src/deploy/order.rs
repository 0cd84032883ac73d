//! Install ordering for artifacts.
//!
//! A publish cut off by the deploy timeout keeps running in the background
//! and may finish after a publish that started later. Every publish takes a
//! [`Ticket`] when it starts; installing through the ticket is skipped when a
//! newer ticket for the same artifact has already been installed.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

/// Per-artifact record of the newest installed ticket.
#[derive(Debug, Default)]
pub(crate) struct InstallOrder {
    next: AtomicU64,
    installed: Mutex<HashMap<String, Arc<Mutex<u64>>>>,
}

/// Claim to install one artifact, ordered by when the publish started.
#[derive(Debug)]
pub(crate) struct Ticket {
    seq: u64,
    slot: Arc<Mutex<u64>>,
}

impl InstallOrder {
    /// Take the next ticket for artifact `name`.
    pub(crate) async fn ticket(&self, name: &str) -> Ticket {
        let seq = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let slot = self
            .installed
            .lock()
            .await
            .entry(name.to_string())
            .or_default()
            .clone();
        Ticket { seq, slot }
    }
}

impl Ticket {
    /// Run `install` unless a newer ticket already installed this artifact.
    ///
    /// Returns `Ok(false)` when skipped. Installs of one artifact never overlap.
    pub(crate) async fn install<F>(self, install: F) -> io::Result<bool>
    where
        F: Future<Output = io::Result<()>>,
    {
        let mut installed = self.slot.lock().await;
        if *installed > self.seq {
            return Ok(false);
        }
        install.await?;
        *installed = self.seq;
        Ok(true)
    }

    /// Blocking form of [`Ticket::install`], for the blocking thread pool.
    pub(crate) fn install_blocking<F>(self, install: F) -> io::Result<bool>
    where
        F: FnOnce() -> io::Result<()>,
    {
        let mut installed = self.slot.blocking_lock();
        if *installed > self.seq {
            return Ok(false);
        }
        install()?;
        *installed = self.seq;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn later_publish_is_not_overwritten_by_earlier_one() {
        let order = InstallOrder::default();
        let early = order.ticket("Home.html").await;
        let late = order.ticket("Home.html").await;

        assert!(late.install(async { Ok(()) }).await.unwrap());

        let ran = AtomicBool::new(false);
        let installed = early
            .install(async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        assert!(!installed);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn publishes_in_start_order_all_install() {
        let order = InstallOrder::default();
        let first = order.ticket("Home.html").await;
        let second = order.ticket("Home.html").await;

        assert!(first.install(async { Ok(()) }).await.unwrap());
        assert!(second.install(async { Ok(()) }).await.unwrap());
    }

    #[tokio::test]
    async fn artifacts_are_ordered_independently() {
        let order = InstallOrder::default();
        let article = order.ticket("Home.html").await;
        let data = order.ticket("Home.json").await;

        assert!(data.install(async { Ok(()) }).await.unwrap());
        assert!(article.install(async { Ok(()) }).await.unwrap());
    }

    #[tokio::test]
    async fn failed_install_does_not_block_older_tickets() {
        let order = InstallOrder::default();
        let early = order.ticket("Home.html").await;
        let late = order.ticket("Home.html").await;

        let err = late
            .install(async { Err(io::Error::other("disk full")) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(early.install(async { Ok(()) }).await.unwrap());
    }

    #[tokio::test]
    async fn blocking_install_respects_order() {
        let order = InstallOrder::default();
        let early = order.ticket("Home.html").await;
        let late = order.ticket("Home.html").await;

        let results = tokio::task::spawn_blocking(move || {
            let late = late.install_blocking(|| Ok(())).unwrap();
            let early = early
                .install_blocking(|| panic!("stale install must be skipped"))
                .unwrap();
            (late, early)
        })
        .await
        .unwrap();
        assert_eq!(results, (true, false));
    }
}
