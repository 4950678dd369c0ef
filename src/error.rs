use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Request-level failures, mapped onto the JSON error bodies the API returns.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{message}")]
    Internal { message: &'static str, detail: String },
}

impl ApiError {
    /// 500-class failure: generic message for the caller, raw detail attached
    /// for diagnostics.
    pub fn internal(message: &'static str, err: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            message,
            detail: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.to_string(), None),
            ApiError::Internal { message, detail } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string(), Some(detail))
            }
        };
        (status, Json(ErrorBody { message, error })).into_response()
    }
}
