//! Content services built on the page store and the deployer.

mod page_service;

pub use page_service::{Artifacts, PageService, PublishError};
