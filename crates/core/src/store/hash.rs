//! Stable short keys derived from URLs.

use sha2::{Digest, Sha256};
use url::Url;

use crate::Error;

/// Length of a derived key in hex characters.
pub const KEY_LEN: usize = 8;

/// Derive the storage key for a URL from its host and path.
///
/// Scheme, query and fragment do not take part, so `http://` and
/// `https://` variants of a page share one key.
///
/// # Errors
///
/// Returns `Error::InvalidUrl` if `url` cannot be parsed.
pub fn compute_url_key(url: &str) -> Result<String, Error> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(parsed.host_str().unwrap_or_default().as_bytes());
    hasher.update(parsed.path().as_bytes());
    let mut key = hex::encode(hasher.finalize());
    key.truncate(KEY_LEN);
    Ok(key)
}
