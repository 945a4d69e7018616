use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitefeed_client::fetch::parse_page_url;
use sitefeed_client::{Feed, FeedChannel, FeedEntry};
use sitefeed_core::ReadLaterItem;

use crate::auth::{KeyQuery, authorize};
use crate::error::WebError;
use crate::state::AppState;

use super::{request_origin, xml_response};

#[derive(Debug, Deserialize)]
struct AddRequest {
    url: Option<String>,
    text: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    success: bool,
    id: String,
}

/// Save a link for later. Re-submitting a URL replaces the earlier entry.
pub async fn add_handler(
    State(state): State<AppState>, headers: HeaderMap, Query(query): Query<KeyQuery>, body: Bytes,
) -> Result<Json<AddResponse>, WebError> {
    authorize(state.config.add_key.as_deref(), &headers, &query)?;

    let request: AddRequest =
        serde_json::from_slice(&body).map_err(|e| WebError::BadRequest(format!("malformed request body: {e}")))?;
    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| parse_page_url(url).is_ok())
        .ok_or_else(|| WebError::BadRequest("url is required and must be an http(s) URL".into()))?;

    let item = ReadLaterItem::new(url, request.text, request.title)?;
    let id = state.read_later.add(item).await?;
    Ok(Json(AddResponse { success: true, id }))
}

/// The read-later list as a feed, newest first.
pub async fn feed_handler(
    State(state): State<AppState>, headers: HeaderMap, Query(query): Query<KeyQuery>,
) -> Result<Response, WebError> {
    authorize(state.config.add_key.as_deref(), &headers, &query)?;

    let items = state.read_later.list().await?;
    let feed = read_later_feed(&request_origin(&headers), &items);
    Ok(xml_response(feed.to_rss()))
}

fn read_later_feed(origin: &str, items: &[ReadLaterItem]) -> Feed {
    let entries = items
        .iter()
        .map(|item| FeedEntry {
            title: Some(item.title.clone()),
            id: Some(item.id.clone()),
            link: Some(item.url.clone()),
            description: Some(item.text.clone()).filter(|t| !t.is_empty()),
            published: DateTime::from_timestamp_millis(item.timestamp).unwrap_or_else(Utc::now),
            enclosure: None,
        })
        .collect();

    Feed {
        channel: FeedChannel {
            title: "Read Later List".into(),
            link: origin.to_string(),
            description: "Your personal read-later list".into(),
            language: None,
            generator: None,
            favicon: None,
        },
        entries,
    }
}
