//! Client code for sitefeed.
//!
//! This crate provides page acquisition (HTTP fetch with encoding fallback,
//! optional headless rendering), the declarative extraction engine and RSS
//! serialization shared by the server and CLI.

pub mod acquire;
pub mod engine;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod render;

pub use acquire::{Acquirer, FetchDefaults, FetchPlan, PageSource};
pub use engine::{FeedEngine, run, run_at};
pub use extract::{ItemRecord, normalize_url};
pub use feed::{Enclosure, Feed, FeedChannel, FeedEntry};
pub use fetch::{FetchClient, FetchConfig, FetchResponse};
pub use render::{RenderOptions, Renderer};

#[cfg(feature = "render")]
pub use render::HeadlessRenderer;
