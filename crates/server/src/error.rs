//! HTTP-facing errors for the sitefeed server.
//!
//! Core errors are mapped to statuses by their [`ErrorClass`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use sitefeed_core::{Error, ErrorClass};

pub const AUTH_MESSAGE: &str =
    "Invalid or missing add key. Provide it via the X-Add-Key header or the ?key=xxx query parameter";

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Shared secret missing, wrong, or not configured.
    #[error("UNAUTHORIZED")]
    Unauthorized,

    /// Request body could not be used.
    #[error("INVALID_INPUT: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] Error),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Unauthorized => StatusCode::FORBIDDEN,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Core(err) => status_for(err),
        }
    }
}

/// Status code for a core error.
pub fn status_for(err: &Error) -> StatusCode {
    match err.class() {
        ErrorClass::Config | ErrorClass::Input => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Acquisition | ErrorClass::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let message = match &self {
            WebError::Unauthorized => AUTH_MESSAGE.to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
