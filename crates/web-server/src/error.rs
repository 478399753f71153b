use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("Metrics output was not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self, "Failed to render metrics.");
        let body = Json(json!({ "error": "Metrics are temporarily unavailable" }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
