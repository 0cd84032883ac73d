//! Deployer that publishes nothing.

use async_trait::async_trait;

use super::{DeployError, Deployer};
use crate::models::Page;

/// Accepts every deployment without doing any I/O.
///
/// Not reachable from configuration: a server must have a real target.
/// Useful for tests and for tools that only touch the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpDeployer;

#[async_trait]
impl Deployer for NoOpDeployer {
    async fn deploy_article(&self, _page: &Page) -> Result<(), DeployError> {
        Ok(())
    }

    async fn deploy_data(&self, _page: &Page) -> Result<(), DeployError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
