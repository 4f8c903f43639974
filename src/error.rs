use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Domain error kinds, per the reminder-delivery core's error design:
/// `NotFound`, `InvalidEvent`, `Transient`, `Unsupported`, `Canceled`, plus
/// the infrastructure variants every service needs to report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("operation canceled")]
    Canceled,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Repository layer helper: translate a store "no rows" result into
    /// `NotFound`, surface everything else verbatim as `Transient`.
    pub fn from_store(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Transient(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::InvalidEvent(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_EVENT", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unsupported(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UNSUPPORTED", msg.clone())
            }
            AppError::Canceled => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CANCELED",
                self.to_string(),
            ),
            AppError::Transient(msg) => {
                tracing::warn!("transient error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "TRANSIENT", msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    e.to_string(),
                )
            }
            AppError::Queue(msg) => {
                tracing::error!("queue error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "QUEUE_ERROR", msg.clone())
            }
            AppError::Config(msg) => {
                tracing::error!("configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    e.to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
