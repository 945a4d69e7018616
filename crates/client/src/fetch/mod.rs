//! Plain HTTP page fetching.
//!
//! - One shared reqwest client (rustls, gzip/brotli/deflate)
//! - User-Agent and timeout per request, so each SDD can override them
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Non-2xx responses are errors; nothing is retried

pub mod decode;
pub mod url;

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};

pub use decode::{DecodeCandidates, FALLBACK_ENCODINGS, candidate_encodings, charset_from_content_type, decode_page};
pub use self::url::{UrlError, parse_page_url};

use sitefeed_core::{AppConfig, Error};

/// `Accept-Charset` sent with every request. Some servers pick the legacy
/// Chinese encoding only when asked for it.
const ACCEPT_CHARSET: &str = "gbk, utf-8;q=0.7, *;q=0.3";

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Default User-Agent when a request does not set one.
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Default request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: sitefeed_core::config::default_user_agent(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(30_000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

/// HTTP fetch client.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// # Errors
    ///
    /// - `Error::FetchTimeout` if the request exceeds its timeout
    /// - `Error::HttpError` on transport failure or a non-success status
    /// - `Error::FetchTooLarge` if the body exceeds `max_bytes`
    pub async fn fetch(&self, url: &Url, opts: &RequestOptions) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let timeout = opts.timeout.unwrap_or(self.config.timeout);
        let user_agent = opts.user_agent.as_deref().unwrap_or(&self.config.user_agent);

        let response = self
            .http
            .get(url.as_str())
            .timeout(timeout)
            .header(header::USER_AGENT, user_agent)
            .header(header::ACCEPT, ACCEPT)
            .header(header::ACCEPT_CHARSET, ACCEPT_CHARSET)
            .send()
            .await
            .map_err(|e| request_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("{url} returned status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{len} bytes exceeds {}", self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| request_error(e, timeout))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(FetchResponse { final_url, status, content_type, bytes, fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn request_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(format!("no response within {}ms", timeout.as_millis()))
    } else {
        Error::HttpError(format!("network error: {e}"))
    }
}
