use crate::{error::AppError, AppState};
use axum::{
    extract::State,
    http::{header, Uri},
    response::IntoResponse,
};

/// # GET /
/// Also serves every path no other route claims. Echoes the path back,
/// HTML-escaped and quoted.
pub async fn echo_path(uri: Uri) -> String {
    format!("Hello, \"{}\"", html_escape::encode_safe(uri.path()))
}

/// # GET /hi
pub async fn hi() -> &'static str {
    "Hi"
}

/// # GET /metrics
/// Pull-based exposition for Prometheus-compatible scrapers.
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let (content_type, body) = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, content_type)], body))
}
