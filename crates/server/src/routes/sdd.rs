use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::auth::{KeyQuery, authorize};
use crate::error::WebError;
use crate::state::AppState;

use super::request_origin;

#[derive(Debug, Deserialize)]
struct AddSddRequest {
    sdd: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct AddSddResponse {
    success: bool,
    key: String,
    rss_url: String,
}

#[derive(Debug, Serialize)]
pub struct ListEntry {
    key: String,
    title: String,
    url: String,
    rss_url: String,
    favicon: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    success: bool,
    total: usize,
    items: Vec<ListEntry>,
}

/// Store a new SDD. The body is only parsed once the caller is authorized.
pub async fn add_sdd_handler(
    State(state): State<AppState>, headers: HeaderMap, Query(query): Query<KeyQuery>, body: Bytes,
) -> Result<Json<AddSddResponse>, WebError> {
    authorize(state.config.add_key.as_deref(), &headers, &query)?;

    let request: AddSddRequest =
        serde_json::from_slice(&body).map_err(|e| WebError::BadRequest(format!("malformed request body: {e}")))?;
    let sdd = request.sdd.ok_or_else(|| WebError::BadRequest("missing field: sdd".into()))?;

    let key = state.registry.save(&sdd).await?;
    Ok(Json(AddSddResponse { success: true, rss_url: format!("/rss/{key}"), key }))
}

/// Stored SDDs, preceded by the read-later feed.
pub async fn list_handler(
    State(state): State<AppState>, headers: HeaderMap, Query(query): Query<KeyQuery>,
) -> Result<Json<ListResponse>, WebError> {
    authorize(state.config.add_key.as_deref(), &headers, &query)?;

    let origin = request_origin(&headers);
    let key = state.config.add_key.as_deref().unwrap_or_default();
    let read_later_url = format!("{origin}/read-later?key={key}");

    let mut items = vec![ListEntry {
        key: "read-later".into(),
        title: "Read Later".into(),
        url: read_later_url.clone(),
        rss_url: read_later_url,
        favicon: Some(format!("{origin}/favicon.ico")),
    }];

    items.extend(state.registry.list().await?.into_iter().map(|site| ListEntry {
        rss_url: format!("{origin}/rss/{}", site.key),
        key: site.key,
        title: site.title,
        url: site.url,
        favicon: site.favicon,
    }));

    Ok(Json(ListResponse { success: true, total: items.len(), items }))
}
