//! HTTP routes.

use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod health;
pub mod page;

/// Upper bound on a whole request, deployment included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the application router.
///
/// Editor routes live under the state's prefix. When `static_dir` is given
/// (folder deployment), every other path is served from that directory.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let prefix = state.prefix().to_string();

    let mut app = Router::new().merge(health::router());
    app = if prefix.is_empty() {
        app.merge(page::router())
    } else {
        app.nest(&prefix, page::router())
    };

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        REQUEST_TIMEOUT,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
