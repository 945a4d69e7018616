//! Headless browser rendering for pages that build their list client-side.
//!
//! The [`Renderer`] trait is always available so acquisition can be wired
//! the same way with or without a browser. The chromiumoxide-backed
//! [`HeadlessRenderer`] is compiled only with the `render` feature.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use sitefeed_core::sdd::Viewport;

/// Why a headless render produced no markup.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not start browser: {0}")]
    BrowserLaunch(String),

    /// Page setup or navigation was refused by the browser.
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("could not read rendered DOM: {0}")]
    ContentRetrieval(String),

    #[error("render exceeded {0}ms")]
    Timeout(u64),
}

impl From<RenderError> for sitefeed_core::Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Timeout(ms) => sitefeed_core::Error::FetchTimeout(format!("render exceeded {ms}ms")),
            other => sitefeed_core::Error::RenderFailed(other.to_string()),
        }
    }
}

/// When navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    /// The `load` event.
    #[default]
    Load,
    /// `DOMContentLoaded`; no extra settling.
    DomContentLoaded,
    /// `load` plus a settle period for late XHR-driven content.
    NetworkIdle,
}

impl WaitUntil {
    /// Map the puppeteer-style names found in SDDs. Unknown names mean `Load`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::to_ascii_lowercase).as_deref() {
            Some("domcontentloaded") => WaitUntil::DomContentLoaded,
            Some("networkidle0" | "networkidle2" | "networkidle") => WaitUntil::NetworkIdle,
            _ => WaitUntil::Load,
        }
    }

    /// Extra time to let scripts finish after navigation.
    pub fn settle(&self) -> Duration {
        match self {
            WaitUntil::DomContentLoaded => Duration::ZERO,
            WaitUntil::Load => Duration::from_millis(500),
            WaitUntil::NetworkIdle => Duration::from_millis(1_500),
        }
    }
}

/// Per-render settings, resolved from the SDD fetch block.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Overall budget in milliseconds, navigation included (default: 30000).
    pub timeout_ms: u64,

    pub user_agent: Option<String>,

    pub viewport: Viewport,

    pub wait_until: WaitUntil,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { timeout_ms: 30_000, user_agent: None, viewport: Viewport::default(), wait_until: WaitUntil::default() }
    }
}

/// Serialized DOM after scripts ran.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,

    /// Wall time from page creation to DOM capture.
    pub render_time_ms: u64,
}

/// Turns a URL into post-script markup.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError>;
}

/// Run `work` within `budget_ms`, then run `cleanup` whatever the outcome.
///
/// A render that fails or overruns still releases its tab.
#[cfg_attr(not(feature = "render"), allow(dead_code))]
async fn bounded_then_cleanup<T, W, C>(budget_ms: u64, work: W, cleanup: C) -> Result<T, RenderError>
where
    W: std::future::Future<Output = Result<T, RenderError>>,
    C: std::future::Future<Output = ()>,
{
    let result = tokio::time::timeout(Duration::from_millis(budget_ms), work)
        .await
        .unwrap_or(Err(RenderError::Timeout(budget_ms)));
    cleanup.await;
    result
}

#[cfg(feature = "render")]
pub use headless::HeadlessRenderer;

#[cfg(feature = "render")]
mod headless {
    use std::time::{Duration, Instant};

    use chromiumoxide::Page;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
    use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
    use futures_util::StreamExt;
    use url::Url;

    use super::{RenderError, RenderOptions, RenderedPage, Renderer, bounded_then_cleanup};

    /// Chromium driven over CDP; one browser shared by all renders, one tab per render.
    pub struct HeadlessRenderer {
        browser: Browser,
    }

    impl HeadlessRenderer {
        /// Launch a headless browser.
        ///
        /// A background task drives the Chrome DevTools Protocol event stream
        /// for as long as the browser lives.
        pub async fn new() -> Result<Self, RenderError> {
            let config = BrowserConfig::builder()
                .no_sandbox()
                .build()
                .map_err(RenderError::BrowserLaunch)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        tracing::debug!(error = %e, "CDP event stream closed");
                        break;
                    }
                }
            });

            tracing::info!("headless browser launched");
            Ok(Self { browser })
        }
    }

    async fn drive(page: Page, url: Url, opts: RenderOptions) -> Result<String, RenderError> {
        if let Some(user_agent) = &opts.user_agent {
            page.set_user_agent(SetUserAgentOverrideParams::new(user_agent.clone()))
                .await
                .map_err(navigation)?;
        }

        let metrics = SetDeviceMetricsOverrideParams::new(
            i64::from(opts.viewport.width),
            i64::from(opts.viewport.height),
            1.0,
            false,
        );
        page.execute(metrics).await.map_err(navigation)?;

        page.goto(url.as_str()).await.map_err(navigation)?;
        page.wait_for_navigation().await.map_err(navigation)?;

        let settle = opts.wait_until.settle();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        page.content()
            .await
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))
    }

    fn navigation(err: chromiumoxide::error::CdpError) -> RenderError {
        RenderError::Navigation(err.to_string())
    }

    #[async_trait::async_trait]
    impl Renderer for HeadlessRenderer {
        async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
            let start = Instant::now();
            let page = tokio::time::timeout(Duration::from_millis(opts.timeout_ms), self.browser.new_page("about:blank"))
                .await
                .map_err(|_| RenderError::Timeout(opts.timeout_ms))?
                .map_err(navigation)?;

            let work = drive(page.clone(), url.clone(), opts.clone());
            let cleanup = async move {
                if let Err(e) = page.close().await {
                    tracing::debug!(error = %e, "failed to close tab");
                }
            };
            let html = bounded_then_cleanup(opts.timeout_ms, work, cleanup).await?;

            let render_time_ms = start.elapsed().as_millis() as u64;
            tracing::debug!(%url, render_time_ms, "rendered page");
            Ok(RenderedPage { html, render_time_ms })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        #[ignore = "requires Chrome/Chromium installation"]
        async fn test_headless_renderer_new() {
            let renderer = HeadlessRenderer::new().await;
            assert!(renderer.is_ok());
        }

        #[tokio::test]
        #[ignore = "requires network and Chrome/Chromium"]
        async fn test_render_simple_page() {
            let renderer = HeadlessRenderer::new().await.unwrap();
            let url = Url::parse("https://example.com").unwrap();
            let page = renderer.render(&url, &RenderOptions::default()).await.unwrap();
            assert!(page.html.contains("<html"));
        }
    }
}
