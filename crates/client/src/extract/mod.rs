//! Declarative extraction primitives.
//!
//! ### Selector Resolution
//! - CSS selectors compiled once per run; unparseable ones match nothing.
//! - Subtract selectors detach noise (ads, related blocks) from each item
//!   container before any field is read.
//!
//! ### Field Extraction
//! - `text`, `attr`, `image` read the first match under the item container.
//! - `var` reads a page-level value resolved once per document.
//!
//! ### URL Normalization
//! - Relative links and image sources are resolved against the SDD origin.

pub mod field;
pub mod normalize;
pub mod select;

use std::collections::BTreeMap;

pub use field::{CompiledField, PageValues, extract_field, resolve_page_metadata};
pub use normalize::normalize_url;
pub use select::{parse_selector, parse_selectors, select, select_document, subtract};

/// Field values extracted from one item container, keyed by field name.
///
/// `None` marks a field whose selector matched nothing or whose attribute
/// was absent.
pub type ItemRecord = BTreeMap<String, Option<String>>;
