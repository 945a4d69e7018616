//! Shared-secret check for the write and listing endpoints.

use axum::http::HeaderMap;
use serde::Deserialize;

use crate::error::WebError;

pub const ADD_KEY_HEADER: &str = "x-add-key";

/// Query string carrying the secret as `?key=`.
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// Accept the request if the header or the query parameter carries the
/// configured key. Without a configured key every request is rejected.
pub fn authorize(configured: Option<&str>, headers: &HeaderMap, query: &KeyQuery) -> Result<(), WebError> {
    let Some(expected) = configured.filter(|k| !k.is_empty()) else {
        return Err(WebError::Unauthorized);
    };

    let from_header = headers.get(ADD_KEY_HEADER).and_then(|v| v.to_str().ok());
    if from_header == Some(expected) || query.key.as_deref() == Some(expected) {
        return Ok(());
    }
    Err(WebError::Unauthorized)
}
