use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use crate::error::status_for;
use crate::feeds::generate_feed;
use crate::state::AppState;

use super::xml_response;

/// Feed XML for a stored SDD. Failures are answered as plain text.
pub async fn rss_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match generate_feed(&state, &name).await {
        Ok(xml) => xml_response(xml),
        Err(err) => {
            let status = status_for(&err);
            if status.is_server_error() {
                tracing::error!(name, error = %err, "feed generation failed");
            } else {
                tracing::debug!(name, error = %err, "feed request rejected");
            }
            (status, format!("Error generating RSS feed: {err}")).into_response()
        }
    }
}
