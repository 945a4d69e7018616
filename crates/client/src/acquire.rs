//! Page acquisition: turn an SDD's fetch settings into decoded markup.
//!
//! A [`FetchPlan`] is resolved once per SDD; the [`PageSource`] trait is the
//! seam callers inject (the server uses [`Acquirer`], tests use stubs).

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use sitefeed_core::sdd::{FetchStrategy, SiteDefinition, Viewport};
use sitefeed_core::{AppConfig, Error};

use crate::fetch::{FetchClient, FetchConfig, RequestOptions, candidate_encodings, decode_page, parse_page_url};
use crate::render::{RenderOptions, Renderer, WaitUntil};

/// Process-wide defaults an SDD may override.
#[derive(Debug, Clone)]
pub struct FetchDefaults {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetchDefaults {
    fn default() -> Self {
        Self { user_agent: sitefeed_core::config::default_user_agent(), timeout: Duration::from_millis(30_000) }
    }
}

impl From<&AppConfig> for FetchDefaults {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout() }
    }
}

/// Everything needed to acquire one page.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub url: Url,
    pub strategy: FetchStrategy,
    pub user_agent: String,
    pub timeout: Duration,
    pub viewport: Viewport,
    pub wait_until: WaitUntil,
    /// Encoding hint from the SDD, tried first.
    pub encoding: Option<String>,
}

impl FetchPlan {
    /// Resolve the plan for `sdd`, filling gaps from `defaults`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the SDD url is not an absolute
    /// `http`/`https` URL.
    pub fn resolve(sdd: &SiteDefinition, defaults: &FetchDefaults) -> Result<Self, Error> {
        let url = parse_page_url(&sdd.url)?;
        let fetch = &sdd.fetch;

        Ok(Self {
            url,
            strategy: fetch.strategy,
            user_agent: fetch
                .user_agent
                .clone()
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or_else(|| defaults.user_agent.clone()),
            timeout: fetch.timeout.filter(|ms| *ms > 0).map(Duration::from_millis).unwrap_or(defaults.timeout),
            viewport: fetch.viewport.unwrap_or_default(),
            wait_until: WaitUntil::from_label(fetch.wait_until.as_deref()),
            encoding: fetch.encoding.clone().filter(|e| !e.trim().is_empty()),
        })
    }
}

/// Something that can produce decoded markup for a plan.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// # Errors
    ///
    /// Any acquisition error: timeout, non-success status, undecodable
    /// body, or headless rendering unavailable/failed.
    async fn fetch_page(&self, plan: &FetchPlan) -> Result<String, Error>;
}

/// Acquires pages over HTTP, or through a headless browser when the plan asks
/// for one and a renderer is available.
#[derive(Clone)]
pub struct Acquirer {
    fetch: FetchClient,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Acquirer {
    pub fn new(fetch: FetchClient, renderer: Option<Arc<dyn Renderer>>) -> Self {
        Self { fetch, renderer }
    }

    /// Build a plain-HTTP acquirer from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self::new(FetchClient::new(FetchConfig::from(config))?, None))
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn can_render(&self) -> bool {
        self.renderer.is_some()
    }

    async fn fetch_plain(&self, plan: &FetchPlan) -> Result<String, Error> {
        let opts = RequestOptions { user_agent: Some(plan.user_agent.clone()), timeout: Some(plan.timeout) };
        let response = self.fetch.fetch(&plan.url, &opts).await?;

        let candidates = candidate_encodings(plan.encoding.as_deref(), response.content_type.as_deref());
        let (html, encoding) = decode_page(&response.bytes, &candidates)?;
        tracing::debug!(url = %plan.url, encoding = encoding.name(), bytes = response.bytes.len(), "page decoded");
        Ok(html)
    }

    async fn fetch_rendered(&self, plan: &FetchPlan) -> Result<String, Error> {
        let renderer = self.renderer.as_ref().ok_or(Error::RenderDisabled)?;
        let opts = RenderOptions {
            timeout_ms: plan.timeout.as_millis() as u64,
            user_agent: Some(plan.user_agent.clone()),
            viewport: plan.viewport,
            wait_until: plan.wait_until,
        };
        let page = renderer.render(&plan.url, &opts).await?;
        Ok(page.html)
    }
}

#[async_trait::async_trait]
impl PageSource for Acquirer {
    async fn fetch_page(&self, plan: &FetchPlan) -> Result<String, Error> {
        tracing::info!(url = %plan.url, strategy = ?plan.strategy, "acquiring page");
        match plan.strategy {
            FetchStrategy::Plain => self.fetch_plain(plan).await,
            FetchStrategy::Headless => self.fetch_rendered(plan).await,
        }
    }
}
