//! Persisted site definitions.

use std::sync::Arc;

use serde::Serialize;

use super::{SiteDefinition, validate};
use crate::Error;
use crate::store::{ObjectStore, compute_url_key};

const PREFIX: &str = "sdd/";
const SUFFIX: &str = ".sdd.json";

/// Listing entry for a stored definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSummary {
    pub key: String,
    pub title: String,
    pub url: String,
    pub favicon: Option<String>,
}

fn sdd_key(name: &str) -> String {
    format!("{PREFIX}{name}{SUFFIX}")
}

/// Stores SDD documents under keys derived from their URL.
#[derive(Clone)]
pub struct SiteRegistry {
    store: Arc<dyn ObjectStore>,
}

impl SiteRegistry {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Validate and store a raw SDD, returning its key.
    ///
    /// Saving a definition for a URL that is already registered overwrites it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSdd` if validation fails, `Error::InvalidUrl`
    /// if the SDD url cannot be parsed, or a store error.
    pub async fn save(&self, raw: &serde_json::Value) -> Result<String, Error> {
        let sdd = validate(raw)?;
        let key = compute_url_key(&sdd.url)?;
        let body = serde_json::to_vec_pretty(raw)?;
        self.store.put(&sdd_key(&key), body).await?;
        tracing::info!(key, url = %sdd.url, "site definition saved");
        Ok(key)
    }

    /// Load and validate the definition stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if nothing is stored under `name` and
    /// `Error::InvalidSdd` if the stored document does not validate.
    pub async fn load(&self, name: &str) -> Result<SiteDefinition, Error> {
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return Err(Error::NotFound(format!("site definition `{name}`")));
        }

        let bytes = self
            .store
            .get(&sdd_key(name))
            .await?
            .ok_or_else(|| Error::NotFound(format!("site definition `{name}`")))?;

        let raw: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidSdd(format!("stored definition `{name}` is not valid JSON: {e}")))?;
        validate(&raw)
    }

    /// Summaries of every stored definition, ordered by key.
    ///
    /// Definitions that no longer validate are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<SiteSummary>, Error> {
        let mut summaries = Vec::new();
        for entry in self.store.list(PREFIX).await? {
            let Some(key) = entry.key.strip_prefix(PREFIX).and_then(|k| k.strip_suffix(SUFFIX)) else {
                continue;
            };
            match self.load(key).await {
                Ok(sdd) => summaries.push(SiteSummary {
                    key: key.to_string(),
                    title: sdd.title,
                    url: sdd.url,
                    favicon: sdd.favicon,
                }),
                Err(e) => tracing::warn!(key, error = %e, "skipping unreadable site definition"),
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use serde_json::json;

    fn sample(url: &str) -> serde_json::Value {
        json!({
            "version": "1.0",
            "url": url,
            "title": "Example",
            "data_list": {"selector": {"css": ".article"}},
            "data_list_elements": {"title": {"type": "text", "selector": {"css": "h2"}}},
            "rss": {"items": {"title": "title"}}
        })
    }

    async fn registry() -> (Arc<dyn ObjectStore>, SiteRegistry) {
        let store: Arc<dyn ObjectStore> = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        (store.clone(), SiteRegistry::new(store))
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (_, registry) = registry().await;
        let key = registry.save(&sample("https://example.com/news")).await.unwrap();
        assert_eq!(key, compute_url_key("https://example.com/news").unwrap());

        let sdd = registry.load(&key).await.unwrap();
        assert_eq!(sdd.title, "Example");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid() {
        let (store, registry) = registry().await;
        let mut raw = sample("https://example.com/news");
        raw.as_object_mut().unwrap().remove("data_list");

        assert!(matches!(registry.save(&raw).await, Err(Error::InvalidSdd(_))));
        assert!(store.list(PREFIX).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_missing() {
        let (_, registry) = registry().await;
        assert!(matches!(registry.load("deadbeef").await, Err(Error::NotFound(_))));
        assert!(matches!(registry.load("../etc").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_malformed() {
        let (store, registry) = registry().await;
        store.put(&sdd_key("broken"), b"{".to_vec()).await.unwrap();
        assert!(matches!(registry.load("broken").await, Err(Error::InvalidSdd(_))));
    }

    #[tokio::test]
    async fn test_list_summaries() {
        let (store, registry) = registry().await;
        registry.save(&sample("https://example.com/news")).await.unwrap();
        registry.save(&sample("https://example.org/blog")).await.unwrap();
        store.put(&sdd_key("broken"), b"{".to_vec()).await.unwrap();

        let summaries = registry.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.windows(2).all(|w| w[0].key < w[1].key));
        assert!(summaries.iter().any(|s| s.url == "https://example.org/blog"));
    }
}
