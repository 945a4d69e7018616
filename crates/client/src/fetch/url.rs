//! Validation of URLs the service is asked to fetch or save.

use sitefeed_core::Error;

/// Why a page URL was rejected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Parse an absolute `http`/`https` URL.
///
/// Surrounding whitespace is ignored and the fragment is dropped; the query
/// string is kept as given. Unlike a browser address bar, a missing scheme
/// is an error rather than defaulting to `https`.
pub fn parse_page_url(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::MissingHost(trimmed.to_string()));
    }

    parsed.set_fragment(None);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let url = parse_page_url("https://Example.COM/news").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/news");
    }

    #[test]
    fn test_parse_keeps_query_drops_fragment() {
        let url = parse_page_url("  https://example.com/list?page=2#top ").unwrap();
        assert_eq!(url.query(), Some("page=2"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_parse_requires_scheme() {
        assert!(matches!(parse_page_url("example.com/news"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(matches!(parse_page_url("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(parse_page_url("javascript:alert(1)"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse_page_url("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_error_converts_to_invalid_url() {
        let err: Error = UrlError::Empty.into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
