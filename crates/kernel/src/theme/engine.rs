//! Tera-based rendering of deployed articles and editor views.

use std::path::Path;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

use crate::deploy::DeployError;
use crate::models::Page;

use super::templates;

/// Template every deployed article is rendered with.
pub const LAYOUT_TEMPLATE: &str = "layout.html";

/// Renders pages into HTML documents.
///
/// Page content is passed to the layout as a context value and never
/// compiled as template source, so template syntax inside an article shows
/// up literally in the output.
pub struct ArticleRenderer {
    tera: Tera,
}

impl ArticleRenderer {
    /// Load `*.html` templates from `template_dir`, filling gaps with the built-ins.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;
        tera.extend(&Self::builtin_tera()?)
            .context("failed to merge built-in templates")?;

        let template_names: Vec<_> = tera.get_template_names().collect();
        debug!(count = template_names.len(), dir = ?template_dir, "loaded templates");

        Ok(Self { tera })
    }

    /// Renderer using only the built-in templates.
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            tera: Self::builtin_tera()?,
        })
    }

    fn builtin_tera() -> Result<Tera> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates::BUILTIN.iter().copied())
            .context("failed to parse built-in templates")?;
        Ok(tera)
    }

    /// Render a page into a complete HTML document.
    pub fn render_article(&self, page: &Page) -> Result<String, DeployError> {
        let mut context = tera::Context::new();
        context.insert("page", &article_context(page));
        self.tera
            .render(LAYOUT_TEMPLATE, &context)
            .map_err(DeployError::TemplateRender)
    }

    /// Render one of the editor views.
    pub fn render_view(&self, name: &str, context: &tera::Context) -> Result<String, tera::Error> {
        self.tera.render(name, context)
    }

    /// Get the underlying Tera instance.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }
}

/// Values a layout can reach under `page`.
fn article_context(page: &Page) -> serde_json::Value {
    serde_json::json!({
        "id": page.id,
        "title": page.title,
        "content": page.content,
        "created_at": page.created_at.to_rfc3339(),
        "updated_at": page.updated_at.to_rfc3339(),
    })
}

impl std::fmt::Debug for ArticleRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleRenderer").finish()
    }
}
