use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use geotube_core::{client::ErrorBody, store::StoreError, CoordinateError};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    MissingToken,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UsernameTaken => AppError::Conflict(e.to_string()),
            StoreError::InvalidCredentials | StoreError::InvalidSession => {
                AppError::Unauthorized(e.to_string())
            }
            StoreError::InvalidInput(message) => AppError::Validation(message),
            StoreError::Sqlite(_) | StoreError::Io(_) | StoreError::PasswordHash(_) => {
                error!("Store failure: {e}");
                AppError::Internal("Internal server error".into())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorBody {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
