use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::responses::JsonResponse;
use crate::services::file_store::FileStoreError;
use crate::services::stripe::StripeServiceError;

/// Closed set of failures a request can end in. Mapped to the JSON envelope
/// at the handler boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Conflict(String),
    #[error("payment provider error: {0}")]
    Provider(#[from] StripeServiceError),
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FileStoreError> for AppError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::UnsupportedExtension { .. } => AppError::Validation(err.to_string()),
            FileStoreError::Io(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => JsonResponse::bad_request(&msg).into_response(),
            AppError::NotFound(msg) => JsonResponse::not_found(&msg).into_response(),
            AppError::Forbidden(msg) => JsonResponse::forbidden(&msg).into_response(),
            AppError::Authentication(msg) => JsonResponse::unauthorized(&msg).into_response(),
            AppError::Conflict(msg) => JsonResponse::conflict(&msg).into_response(),
            AppError::Provider(err) => {
                error!(?err, "payment provider call failed");
                JsonResponse::server_error("Payment provider error").into_response()
            }
            AppError::Persistence(err) => {
                error!(?err, "database call failed");
                JsonResponse::server_error("Database error").into_response()
            }
            AppError::Internal(msg) => {
                error!(%msg, "internal error");
                JsonResponse::server_error("Internal error").into_response()
            }
        }
    }
}
