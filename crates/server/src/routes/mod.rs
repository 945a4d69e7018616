//! HTTP routes.
//!
//! | route | auth | response |
//! |-------|------|----------|
//! | `GET /` | no | status JSON |
//! | `GET /rss/:name` | no | feed XML |
//! | `POST /add-sdd` | yes | `{success, key, rss_url}` |
//! | `GET /list` | yes | `{success, total, items}` |
//! | `POST /read-later` | yes | `{success, id}` |
//! | `GET /read-later` | yes | read-later feed XML |

mod read_later;
mod rss;
mod sdd;
mod status;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::ADD_KEY_HEADER;
use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(ADD_KEY_HEADER)])
        .expose_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(status::status_handler))
        .route("/rss/:name", get(rss::rss_handler))
        .route("/add-sdd", post(sdd::add_sdd_handler))
        .route("/list", get(sdd::list_handler))
        .route("/read-later", post(read_later::add_handler).get(read_later::feed_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Scheme and host the client used to reach us, for absolute links.
fn request_origin(headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty());
    let proto = header("x-forwarded-proto").unwrap_or("http");
    let host = header("host").unwrap_or("localhost");
    format!("{proto}://{host}")
}

fn xml_response(body: String) -> Response {
    ([(CONTENT_TYPE, "application/xml")], body).into_response()
}
