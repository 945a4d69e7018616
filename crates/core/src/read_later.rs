//! Bounded read-later list.
//!
//! Items live under `readlater/<id>.json`. Adding a URL that is already
//! present replaces the old item. The size cap is enforced lazily: listing
//! deletes everything beyond the newest `limit` items.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::store::{ObjectStore, compute_url_key};

/// Default number of items kept.
pub const READ_LATER_LIMIT: usize = 50;

const PREFIX: &str = "readlater/";

/// A saved URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadLaterItem {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub text: String,
    pub title: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ReadLaterItem {
    /// Build an item stamped with the current time.
    ///
    /// The title defaults to the URL and the note to an empty string.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if `url` cannot be parsed.
    pub fn new(url: &str, text: Option<String>, title: Option<String>) -> Result<Self, Error> {
        Self::new_at(url, text, title, Utc::now().timestamp_millis())
    }

    pub fn new_at(url: &str, text: Option<String>, title: Option<String>, timestamp: i64) -> Result<Self, Error> {
        let id = compute_url_key(url)?;
        let title = title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| url.to_string());
        Ok(Self { id, url: url.to_string(), text: text.unwrap_or_default(), title, timestamp })
    }

    fn key(&self) -> String {
        item_key(&self.id)
    }
}

fn item_key(id: &str) -> String {
    format!("{PREFIX}{id}.json")
}

/// Read-later list over an [`ObjectStore`].
#[derive(Clone)]
pub struct ReadLaterStore {
    store: Arc<dyn ObjectStore>,
    limit: usize,
}

impl ReadLaterStore {
    pub fn new(store: Arc<dyn ObjectStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Save `item`, replacing any existing item with the same URL.
    ///
    /// Returns the item's id. The scan, delete and write are separate store
    /// calls, so concurrent adds of one URL may briefly leave a duplicate.
    pub async fn add(&self, item: ReadLaterItem) -> Result<String, Error> {
        for (key, existing) in self.load_all().await? {
            if existing.url == item.url {
                tracing::debug!(id = %existing.id, url = %item.url, "replacing read-later item");
                self.store.delete(&key).await?;
            }
        }

        let body = serde_json::to_vec_pretty(&item)?;
        self.store.put(&item.key(), body).await?;
        tracing::info!(id = %item.id, url = %item.url, "read-later item saved");
        Ok(item.id)
    }

    /// Items newest first, at most `limit` of them.
    ///
    /// Items beyond the limit are deleted from the store.
    pub async fn list(&self) -> Result<Vec<ReadLaterItem>, Error> {
        let mut items = self.load_all().await?;
        items.sort_by(|(_, a), (_, b)| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));

        if items.len() > self.limit {
            for (key, item) in items.drain(self.limit..) {
                tracing::debug!(id = %item.id, "evicting read-later item");
                if let Err(e) = self.store.delete(&key).await {
                    tracing::warn!(key = %key, error = %e, "failed to evict read-later item");
                }
            }
        }

        Ok(items.into_iter().map(|(_, item)| item).collect())
    }

    /// Every readable stored item together with its key.
    async fn load_all(&self) -> Result<Vec<(String, ReadLaterItem)>, Error> {
        let mut items = Vec::new();
        for entry in self.store.list(PREFIX).await? {
            if !entry.key.ends_with(".json") {
                continue;
            }
            let Some(bytes) = self.store.get(&entry.key).await? else { continue };
            match serde_json::from_slice::<ReadLaterItem>(&bytes) {
                Ok(item) => items.push((entry.key, item)),
                Err(e) => tracing::warn!(key = %entry.key, error = %e, "skipping unreadable read-later item"),
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    async fn read_later(limit: usize) -> (Arc<dyn ObjectStore>, ReadLaterStore) {
        let store: Arc<dyn ObjectStore> = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        (store.clone(), ReadLaterStore::new(store, limit))
    }

    #[test]
    fn test_item_defaults() {
        let item = ReadLaterItem::new_at("https://example.com/post", None, None, 7).unwrap();
        assert_eq!(item.title, "https://example.com/post");
        assert_eq!(item.text, "");
        assert_eq!(item.id.len(), 8);
        assert_eq!(item.timestamp, 7);
    }

    #[test]
    fn test_item_invalid_url() {
        assert!(matches!(ReadLaterItem::new("nope", None, None), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_add_dedupes_by_url() {
        let (_, store) = read_later(READ_LATER_LIMIT).await;
        let url = "https://example.com/post";

        store.add(ReadLaterItem::new_at(url, Some("first".into()), None, 1).unwrap()).await.unwrap();
        store
            .add(ReadLaterItem::new_at(url, Some("second".into()), Some("Post".into()), 2).unwrap())
            .await
            .unwrap();

        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "second");
        assert_eq!(items[0].title, "Post");
        assert_eq!(items[0].timestamp, 2);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_, store) = read_later(READ_LATER_LIMIT).await;
        for (i, path) in ["a", "b", "c"].iter().enumerate() {
            let item = ReadLaterItem::new_at(&format!("https://example.com/{path}"), None, None, i as i64).unwrap();
            store.add(item).await.unwrap();
        }

        let urls: Vec<String> = store.list().await.unwrap().into_iter().map(|i| i.url).collect();
        assert_eq!(urls, vec!["https://example.com/c", "https://example.com/b", "https://example.com/a"]);
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest() {
        let (backing, store) = read_later(READ_LATER_LIMIT).await;
        for i in 0..=READ_LATER_LIMIT {
            let item = ReadLaterItem::new_at(&format!("https://example.com/{i}"), None, None, i as i64).unwrap();
            store.add(item).await.unwrap();
        }
        assert_eq!(backing.list(PREFIX).await.unwrap().len(), READ_LATER_LIMIT + 1);

        let items = store.list().await.unwrap();
        assert_eq!(items.len(), READ_LATER_LIMIT);
        assert!(items.iter().all(|i| i.url != "https://example.com/0"));
        assert_eq!(backing.list(PREFIX).await.unwrap().len(), READ_LATER_LIMIT);
    }

    #[tokio::test]
    async fn test_unreadable_items_skipped() {
        let (backing, store) = read_later(READ_LATER_LIMIT).await;
        backing.put("readlater/broken.json", b"not json".to_vec()).await.unwrap();
        store
            .add(ReadLaterItem::new_at("https://example.com/ok", None, None, 1).unwrap())
            .await
            .unwrap();

        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://example.com/ok");
    }
}
