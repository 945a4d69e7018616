use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    app_name: &'static str,
    version: &'static str,
    add_key_configured: bool,
    storage: &'static str,
    cache_minutes: u64,
    render_enabled: bool,
}

/// Service status. Never reveals the key itself.
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let config = &state.config;
    Json(StatusResponse {
        app_name: "sitefeed",
        version: env!("CARGO_PKG_VERSION"),
        add_key_configured: config.require_add_key().is_ok(),
        storage: config.storage.as_str(),
        cache_minutes: config.cache_minutes,
        render_enabled: config.render_enabled,
    })
}
