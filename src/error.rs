use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for chart-hub API responses.
#[derive(Debug)]
pub enum ChartError {
    Db(String),
    BadRequest(String),
    NotFound(String),
    /// Annotation resolution requires at least one candle in the fetched range.
    EmptyCandles,
    Internal(String),
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(msg) => write!(f, "db_error: {msg}"),
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
            Self::NotFound(msg) => write!(f, "not_found: {msg}"),
            Self::EmptyCandles => write!(f, "empty_candle_series"),
            Self::Internal(msg) => write!(f, "internal_error: {msg}"),
        }
    }
}

impl std::error::Error for ChartError {}

impl IntoResponse for ChartError {
    fn into_response(self) -> Response {
        let (status, error_str) = match &self {
            Self::Db(msg) => (StatusCode::INTERNAL_SERVER_ERROR, format!("db_error:{msg}")),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::EmptyCandles => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "empty_candle_series".to_string(),
            ),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "error": error_str });
        (status, axum::Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for ChartError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Db(e.to_string())
    }
}

impl From<r2d2::Error> for ChartError {
    fn from(e: r2d2::Error) -> Self {
        Self::Db(e.to_string())
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<std::io::Error> for ChartError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
