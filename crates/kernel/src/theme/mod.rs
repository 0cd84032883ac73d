//! Theme layer: templates for deployed articles and the editor.

pub mod engine;
mod templates;

pub use engine::{ArticleRenderer, LAYOUT_TEMPLATE};
