//! Page editing route handlers.
//!
//! `{objectid}` path segments accept either a numeric page ID or a title.

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::Revision;
use crate::state::AppState;

/// Article edit form.
#[derive(Debug, Deserialize)]
pub struct ArticleForm {
    pub content: String,
}

/// Data edit form. The payload must be JSON; a blank field clears it.
#[derive(Debug, Deserialize)]
pub struct DataForm {
    pub data: String,
}

/// New page form.
#[derive(Debug, Deserialize)]
pub struct NewPageForm {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Create the page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route(
            "/edit/article/{objectid}",
            get(edit_article_form).post(save_article),
        )
        .route("/data/{objectid}", get(edit_data_form).post(save_data))
        .route("/new", get(new_page_form).post(create_page))
        .route("/delete/{objectid}", post(delete_page))
        .route("/revisions/{objectid}", get(list_revisions))
        .route("/deploy/{objectid}", post(redeploy))
}

fn view_context(state: &AppState) -> tera::Context {
    let mut context = tera::Context::new();
    context.insert("prefix", state.prefix());
    context
}

fn edit_path(state: &AppState, id: i64) -> String {
    format!("{}/edit/article/{id}", state.prefix())
}

async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let pages = state.store().list_pages().await?;
    let mut context = view_context(&state);
    context.insert("pages", &pages);
    Ok(Html(state.renderer().render_view("index.html", &context)?))
}

async fn edit_article_form(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> AppResult<Html<String>> {
    let page = state.store().get_page(&object_id).await?;
    let mut context = view_context(&state);
    context.insert("page", &page);
    Ok(Html(state.renderer().render_view("edit.html", &context)?))
}

async fn save_article(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
    Form(form): Form<ArticleForm>,
) -> AppResult<Redirect> {
    let page = state
        .pages()
        .update_article_and_deploy(&object_id, &form.content)
        .await?;
    Ok(Redirect::to(&edit_path(&state, page.id)))
}

async fn edit_data_form(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> AppResult<Html<String>> {
    let page = state.store().get_page(&object_id).await?;
    let mut context = view_context(&state);
    context.insert("data", &page.data_text());
    context.insert("page", &page);
    Ok(Html(state.renderer().render_view("data.html", &context)?))
}

async fn save_data(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
    Form(form): Form<DataForm>,
) -> AppResult<Redirect> {
    let raw = form.data.trim();
    let data = if raw.is_empty() {
        None
    } else {
        serde_json::from_str::<serde_json::Value>(raw)
            .map_err(|e| AppError::BadRequest(format!("data must be valid JSON: {e}")))?;
        Some(raw.as_bytes())
    };

    let page = state
        .pages()
        .update_data_and_deploy(&object_id, data)
        .await?;
    Ok(Redirect::to(&format!("{}/data/{}", state.prefix(), page.id)))
}

async fn new_page_form(State(state): State<AppState>) -> AppResult<Html<String>> {
    let context = view_context(&state);
    Ok(Html(state.renderer().render_view("new.html", &context)?))
}

async fn create_page(
    State(state): State<AppState>,
    Form(form): Form<NewPageForm>,
) -> AppResult<Redirect> {
    let page = state
        .pages()
        .create_and_deploy(form.title.trim(), &form.content, None)
        .await?;
    Ok(Redirect::to(&edit_path(&state, page.id)))
}

async fn delete_page(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> AppResult<Redirect> {
    state.pages().delete(&object_id).await?;
    Ok(Redirect::to(&state.index_path()))
}

/// Revision history, oldest first.
///
/// A numeric ID is queried directly, so the history of a deleted page stays
/// reachable; a title must name a live page.
async fn list_revisions(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> AppResult<Json<Vec<Revision>>> {
    let page_id = match object_id.parse::<i64>() {
        Ok(id) => id,
        Err(_) => state.store().get_page_by_title(&object_id).await?.id,
    };
    Ok(Json(state.store().list_revisions(page_id).await?))
}

async fn redeploy(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> AppResult<StatusCode> {
    state.pages().redeploy(&object_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
