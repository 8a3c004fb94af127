//! Mapping of [`AuthError`] to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::{AuthError, ErrorCategory};

/// HTTP status for an error: 401 for failed client authentication, 500 for
/// our own failures, 400 for everything else.
#[must_use]
pub fn status_for(err: &AuthError) -> StatusCode {
    match err.category() {
        ErrorCategory::Authentication => StatusCode::UNAUTHORIZED,
        ErrorCategory::Client => StatusCode::BAD_REQUEST,
        ErrorCategory::Server => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"error": ...}` with the matching status. Server errors are logged in
/// full and answered with a bare `server_error`.
pub fn json_error(err: &AuthError) -> Response {
    let status = status_for(err);
    if err.is_server_error() {
        tracing::error!(error = %err, "request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
    }
    (
        status,
        Json(serde_json::json!({ "error": err.oauth_error_code() })),
    )
        .into_response()
}
