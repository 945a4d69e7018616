//! Feed generation: cache lookup, acquisition, extraction, cache fill.

use sitefeed_client::{FeedEngine, FetchPlan};
use sitefeed_core::Error;

use crate::state::AppState;

/// Produce the feed XML for the SDD stored under `name`.
///
/// A fresh cached copy is returned as is; otherwise the page is acquired
/// and extracted, and the result is cached. Cache failures never fail the
/// request.
///
/// # Errors
///
/// `Error::NotFound` for an unknown name, `Error::InvalidSdd` for a stored
/// definition that no longer validates, and any acquisition error.
pub async fn generate_feed(state: &AppState, name: &str) -> Result<String, Error> {
    if let Some(cached) = state.cache.get(name).await {
        tracing::debug!(name, "serving cached feed");
        return Ok(cached);
    }

    let sdd = state.registry.load(name).await?;
    let plan = FetchPlan::resolve(&sdd, &state.defaults)?;
    let html = state.pages.fetch_page(&plan).await?;

    let engine = FeedEngine::new(&sdd);
    let xml = engine.run(&html);
    tracing::info!(name, bytes = xml.len(), "feed generated");

    state.cache.put(name, &xml).await;
    Ok(xml)
}
