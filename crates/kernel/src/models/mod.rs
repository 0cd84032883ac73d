//! Database models.

pub mod page;
pub mod revision;

pub use page::{Page, PageSummary};
pub use revision::Revision;
