use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::{RepositoryError, TxError};

/// The closed set of failures a request can end in. Each variant carries a
/// message meant for the response body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotAvailable(String),

    #[error("{0}")]
    InvalidData(String),

    /// Carries the raw state text exactly as the client sent it.
    #[error("Unknown state: {0}")]
    BadState(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotAvailable(_) | AppError::InvalidData(_) | AppError::BadState(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl<E: Into<AppError>> From<TxError<E>> for AppError {
    fn from(err: TxError<E>) -> Self {
        match err {
            TxError::Rejected(rule) => rule.into(),
            TxError::Store(store) => store.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");

        let body = match &self {
            AppError::BadState(_) => json!({ "error": self.to_string() }),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({
                    "status": status.as_u16(),
                    "error": reason,
                    "message": "Internal server error",
                })
            }
            AppError::NotFound(msg)
            | AppError::NotAvailable(msg)
            | AppError::InvalidData(msg)
            | AppError::Conflict(msg) => {
                tracing::warn!("{}: {}", reason, msg);
                json!({
                    "status": status.as_u16(),
                    "error": reason,
                    "message": msg,
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
