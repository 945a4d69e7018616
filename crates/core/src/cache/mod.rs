//! TTL-gated feed cache.
//!
//! Each feed name owns two objects in the store: the serialized feed and a
//! small metadata document `{ "timestamp": <epoch millis> }` recording when it
//! was written. The two writes are not atomic, so any problem reading the
//! metadata is treated as a miss.
//!
//! The cache never fails its caller: store errors turn into misses on read
//! and are logged and dropped on write.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::ObjectStore;

/// Metadata object stored next to each cached feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

pub fn content_key(name: &str) -> String {
    format!("cache/{name}_feed.xml")
}

pub fn metadata_key(name: &str) -> String {
    format!("cache/{name}_metadata.json")
}

/// Feed cache over an [`ObjectStore`].
#[derive(Clone)]
pub struct FeedCache {
    store: Arc<dyn ObjectStore>,
    ttl: Duration,
}

impl FeedCache {
    /// A zero `ttl` disables the cache: every read misses and writes are skipped.
    pub fn new(store: Arc<dyn ObjectStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Cached content for `name` if it was written less than one TTL ago.
    pub async fn get(&self, name: &str) -> Option<String> {
        self.get_at(name, Utc::now()).await
    }

    /// [`FeedCache::get`] with an explicit clock.
    pub async fn get_at(&self, name: &str, now: DateTime<Utc>) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }

        let metadata = match self.store.get(&metadata_key(name)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(feed = name, "cache miss: no metadata");
                return None;
            }
            Err(e) => {
                tracing::warn!(feed = name, error = %e, "cache metadata read failed");
                return None;
            }
        };

        let metadata: CacheMetadata = match serde_json::from_slice(&metadata) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(feed = name, error = %e, "cache metadata unreadable");
                return None;
            }
        };

        let age_ms = now.timestamp_millis().saturating_sub(metadata.timestamp);
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if age_ms >= ttl_ms {
            tracing::debug!(feed = name, age_ms, "cache miss: expired");
            return None;
        }

        match self.store.get(&content_key(name)).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(content) => {
                    tracing::debug!(feed = name, age_ms, "cache hit");
                    Some(content)
                }
                Err(e) => {
                    tracing::warn!(feed = name, error = %e, "cached feed is not UTF-8");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(feed = name, "cache miss: no content");
                None
            }
            Err(e) => {
                tracing::warn!(feed = name, error = %e, "cache content read failed");
                None
            }
        }
    }

    /// Store `content` under `name`, stamped with the current time.
    pub async fn put(&self, name: &str, content: &str) {
        self.put_at(name, content, Utc::now()).await;
    }

    /// [`FeedCache::put`] with an explicit clock.
    pub async fn put_at(&self, name: &str, content: &str, now: DateTime<Utc>) {
        if !self.is_enabled() {
            return;
        }

        if let Err(e) = self.store.put(&content_key(name), content.as_bytes().to_vec()).await {
            tracing::warn!(feed = name, error = %e, "cache content write failed");
            return;
        }

        let metadata = CacheMetadata { timestamp: now.timestamp_millis() };
        let bytes = match serde_json::to_vec(&metadata) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(feed = name, error = %e, "cache metadata encode failed");
                return;
            }
        };
        if let Err(e) = self.store.put(&metadata_key(name), bytes).await {
            tracing::warn!(feed = name, error = %e, "cache metadata write failed");
        }
    }
}
