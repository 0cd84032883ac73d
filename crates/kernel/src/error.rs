//! HTTP error type for route handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::content::PublishError;
use crate::deploy::DeployError;
use crate::store::StoreError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("storage error")]
    Store(#[source] StoreError),

    #[error("page {page_id} was saved but could not be deployed")]
    Deploy {
        page_id: i64,
        #[source]
        source: DeployError,
    },

    #[error("template error")]
    Render(#[from] tera::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound,
            StoreError::Conflict(_) => AppError::Conflict(e.to_string()),
            StoreError::InvalidTitle => AppError::BadRequest(e.to_string()),
            other => AppError::Store(other),
        }
    }
}

impl From<PublishError> for AppError {
    fn from(e: PublishError) -> Self {
        match e {
            PublishError::Store(e) => e.into(),
            PublishError::Deploy { page, source } => AppError::Deploy {
                page_id: page.id,
                source,
            },
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Deploy { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) | AppError::Store(_) | AppError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            AppError::Store(e) => {
                tracing::error!(error = ?e, "storage error");
                "internal server error".to_string()
            }
            AppError::Render(e) => {
                tracing::error!(error = ?e, "template error");
                "internal server error".to_string()
            }
            AppError::Deploy { page_id, source } => {
                // The source names local paths or remote hosts; keep it in the log.
                tracing::error!(page_id, error = ?source, "deployment failed");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
