use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::RecommenderError;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Catalog CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Recommendation error: {0}")]
    Recommender(RecommenderError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<RecommenderError> for AppError {
    fn from(err: RecommenderError) -> Self {
        match err {
            RecommenderError::NotFitted => AppError::ModelUnavailable(err.to_string()),
            other => AppError::Recommender(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            AppError::Catalog(_)
            | AppError::Csv(_)
            | AppError::Io(_)
            | AppError::Snapshot(_)
            | AppError::ModelUnavailable(_)
            | AppError::Recommender(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "detail": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
