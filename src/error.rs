use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::metrics::MetricsError;
use crate::services::TimerError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored or fetched record could not be mapped to its canonical shape.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Records backend error: {0}")]
    Upstream(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Timer(#[from] TimerError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Metrics(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Timer(e @ TimerError::NoCourseSelected) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Timer(e @ TimerError::Running) => (StatusCode::CONFLICT, e.to_string()),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Migration(e) => {
                error!("migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::InvalidRecord(msg) => {
                error!("invalid record: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Invalid record: {}", msg),
                )
            }
            AppError::Upstream(msg) => {
                error!("records backend error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Records backend error".to_string())
            }
            AppError::Http(e) => {
                error!("records backend unreachable: {}", e);
                (StatusCode::BAD_GATEWAY, "Records backend unreachable".to_string())
            }
            AppError::Config(msg) => {
                error!("configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
