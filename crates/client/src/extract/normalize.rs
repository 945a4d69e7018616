//! Resolution of extracted links and image sources against the SDD base URL.
//!
//! Relative values are resolved against the base URL's *origin*, not its
//! path: `a/b` on `https://example.com/news/` becomes
//! `https://example.com/a/b`. Stored SDDs rely on this.

use url::Url;

/// Make `value` absolute relative to `base`.
///
/// - empty values pass through
/// - values that already parse as absolute URLs pass through
/// - `//host/path` takes the base scheme
/// - `/path` is appended to the base origin
/// - anything else is appended to the base origin after a single `/`
///
/// If `base` does not parse or has no usable origin, `value` is returned
/// unchanged.
pub fn normalize_url(value: &str, base: &str) -> String {
    if value.is_empty() || Url::parse(value).is_ok() {
        return value.to_string();
    }

    let Ok(base) = Url::parse(base) else {
        tracing::debug!(base, "base URL does not parse; leaving value unresolved");
        return value.to_string();
    };

    let origin = base.origin();
    if !origin.is_tuple() {
        return value.to_string();
    }
    let origin = origin.ascii_serialization();

    if let Some(rest) = value.strip_prefix("//") {
        format!("{}://{rest}", base.scheme())
    } else if value.starts_with('/') {
        format!("{origin}{value}")
    } else {
        format!("{origin}/{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/news/list.html";

    #[test]
    fn test_passthrough() {
        assert_eq!(normalize_url("", BASE), "");
        assert_eq!(normalize_url("https://other.org/x", BASE), "https://other.org/x");
        assert_eq!(normalize_url("http://other.org", BASE), "http://other.org");
    }

    #[test]
    fn test_root_relative() {
        assert_eq!(normalize_url("/a", BASE), "https://example.com/a");
        assert_eq!(normalize_url("/a?x=1#top", BASE), "https://example.com/a?x=1#top");
    }

    #[test]
    fn test_plain_relative_uses_origin() {
        assert_eq!(normalize_url("a/b.html", BASE), "https://example.com/a/b.html");
    }

    #[test]
    fn test_protocol_relative() {
        assert_eq!(normalize_url("//cdn.example.com/i.png", BASE), "https://cdn.example.com/i.png");
    }

    #[test]
    fn test_origin_keeps_port() {
        assert_eq!(normalize_url("/a", "http://localhost:8080/list"), "http://localhost:8080/a");
    }

    #[test]
    fn test_malformed_base_fails_soft() {
        assert_eq!(normalize_url("/a", "not a url"), "/a");
        assert_eq!(normalize_url("a", ""), "a");
        assert_eq!(normalize_url("/a", "data:text/plain,hi"), "/a");
    }

    #[test]
    fn test_idempotent() {
        for value in ["/a", "a/b", "//cdn.example.com/x", "https://example.com/y", ""] {
            let once = normalize_url(value, BASE);
            assert_eq!(normalize_url(&once, BASE), once, "value: {value}");
        }
    }
}
