//! Shared application state handed to every handler.

use std::sync::Arc;

use sitefeed_client::{FetchDefaults, PageSource};
use sitefeed_core::{AppConfig, FeedCache, ObjectStore, ReadLaterStore, SiteRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: FeedCache,
    pub registry: SiteRegistry,
    pub read_later: ReadLaterStore,
    pub pages: Arc<dyn PageSource>,
    pub defaults: FetchDefaults,
}

impl AppState {
    /// Wire the stores and page source over one object store.
    pub fn new(config: AppConfig, store: Arc<dyn ObjectStore>, pages: Arc<dyn PageSource>) -> Self {
        let defaults = FetchDefaults::from(&config);
        Self {
            cache: FeedCache::new(store.clone(), config.cache_ttl()),
            registry: SiteRegistry::new(store.clone()),
            read_later: ReadLaterStore::new(store, config.read_later_limit),
            pages,
            defaults,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sitefeed_client::{FetchPlan, PageSource};
    use sitefeed_core::store::SqliteStore;
    use sitefeed_core::{AppConfig, Error};

    use super::AppState;

    pub const TEST_KEY: &str = "s3cret";

    /// Serves fixed markup and counts calls.
    pub struct StubPages {
        pub html: Result<String, String>,
        pub calls: AtomicUsize,
    }

    impl StubPages {
        pub fn ok(html: &str) -> Arc<Self> {
            Arc::new(Self { html: Ok(html.to_string()), calls: AtomicUsize::new(0) })
        }

        pub fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self { html: Err(message.to_string()), calls: AtomicUsize::new(0) })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PageSource for StubPages {
        async fn fetch_page(&self, _plan: &FetchPlan) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.html.clone().map_err(Error::HttpError)
        }
    }

    pub async fn state_with(config: AppConfig, pages: Arc<StubPages>) -> AppState {
        let store = SqliteStore::open_in_memory().await.unwrap();
        AppState::new(config, Arc::new(store), pages)
    }

    pub async fn test_state(pages: Arc<StubPages>) -> AppState {
        let config = AppConfig { add_key: Some(TEST_KEY.into()), ..Default::default() };
        state_with(config, pages).await
    }
}
