//! Core types and shared functionality for sitefeed.
//!
//! This crate provides:
//! - Unified error types and layered configuration
//! - The Site Data Definition (SDD) model, validator and registry
//! - An object-store port with filesystem and SQLite backends
//! - The TTL feed cache and the read-later list built on that port

pub mod cache;
pub mod config;
pub mod error;
pub mod read_later;
pub mod sdd;
pub mod store;

pub use cache::FeedCache;
pub use config::{AppConfig, ConfigError, StorageBackend};
pub use error::{Error, ErrorClass};
pub use read_later::{READ_LATER_LIMIT, ReadLaterItem, ReadLaterStore};
pub use sdd::{SiteDefinition, SiteRegistry, SiteSummary};
pub use store::{ObjectStore, open_store};
