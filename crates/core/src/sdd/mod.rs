//! Site Data Definition (SDD) model.
//!
//! An SDD is the persisted JSON document describing how one site's list
//! page is turned into feed entries. The wire names (`data_list`,
//! `data_list_elements`, `meta`, `rss`) are those of the stored documents;
//! the Rust types use the engine's vocabulary.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

pub mod registry;
mod validation;

pub use registry::{SiteRegistry, SiteSummary};
pub use validation::{REQUIRED_FIELDS, parse_sdd, validate};

/// A validated site definition, immutable for the duration of one run.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteDefinition {
    #[serde(deserialize_with = "version_string")]
    pub version: String,

    /// Base URL of the list page, also used to resolve relative links.
    pub url: String,

    pub title: String,

    #[serde(default)]
    pub favicon: Option<String>,

    #[serde(flatten)]
    pub fetch: FetchSpec,

    #[serde(rename = "data_list")]
    pub item_list: ItemListSpec,

    #[serde(rename = "data_list_elements")]
    pub fields: BTreeMap<String, FieldSpec>,

    #[serde(rename = "meta", default)]
    pub page_metadata: BTreeMap<String, FieldSpec>,

    #[serde(rename = "rss")]
    pub output: OutputSpec,
}

/// How the page should be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Render in a headless browser first.
    Headless,
    /// Plain HTTP GET. Any unrecognized method name lands here.
    #[default]
    #[serde(other)]
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280, height: 800 }
    }
}

/// Acquisition parameters carried at the top level of the SDD.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchSpec {
    #[serde(rename = "suggest_fetch_method", default)]
    pub strategy: FetchStrategy,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// Character encoding hint tried first when decoding the response.
    #[serde(default)]
    pub encoding: Option<String>,

    /// Timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub viewport: Option<Viewport>,

    #[serde(default, alias = "waitUntil")]
    pub wait_until: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorSpec {
    pub css: String,
}

/// Where the repeating item containers live.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemListSpec {
    pub selector: SelectorSpec,

    /// Removed from every container before any field is read.
    #[serde(rename = "un_selectors", default)]
    pub subtract: Vec<String>,
}

/// One kind per extraction rule, each carrying only what it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Trimmed text content of the first match.
    Text { selector: String },
    /// Named attribute of the first match.
    Attribute { selector: String, attribute: String },
    /// `src` attribute of the first match.
    Image { selector: String },
    /// Dotted reference (`meta.<name>`) into the page metadata.
    PageVariable { path: String },
}

impl FieldKind {
    pub fn selector(&self) -> Option<&str> {
        match self {
            FieldKind::Text { selector } | FieldKind::Attribute { selector, .. } | FieldKind::Image { selector } => {
                Some(selector.as_str())
            }
            FieldKind::PageVariable { .. } => None,
        }
    }
}

/// A rule for extracting one scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawFieldSpec")]
pub struct FieldSpec {
    pub kind: FieldKind,
    /// Removed from the matched element before its value is read.
    pub subtract: Vec<String>,
}

impl FieldSpec {
    pub fn text(selector: impl Into<String>) -> Self {
        Self { kind: FieldKind::Text { selector: selector.into() }, subtract: Vec::new() }
    }

    pub fn attribute(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Attribute { selector: selector.into(), attribute: attribute.into() },
            subtract: Vec::new(),
        }
    }

    pub fn image(selector: impl Into<String>) -> Self {
        Self { kind: FieldKind::Image { selector: selector.into() }, subtract: Vec::new() }
    }

    pub fn page_variable(path: impl Into<String>) -> Self {
        Self { kind: FieldKind::PageVariable { path: path.into() }, subtract: Vec::new() }
    }

    pub fn with_subtract(mut self, selectors: &[&str]) -> Self {
        self.subtract = selectors.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Field spec as it appears on the wire, with the string `type` tag.
#[derive(Debug, Deserialize)]
struct RawFieldSpec {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    selector: Option<SelectorSpec>,
    #[serde(default)]
    value: Option<String>,
    #[serde(rename = "un_selectors", default)]
    subtract: Vec<String>,
}

impl TryFrom<RawFieldSpec> for FieldSpec {
    type Error = String;

    fn try_from(raw: RawFieldSpec) -> Result<Self, Self::Error> {
        let selector = raw.selector.map(|s| s.css);
        let require_selector = |kind: &str| selector.clone().ok_or_else(|| format!("`{kind}` field requires a selector"));

        let kind = match raw.kind.as_str() {
            "text" => FieldKind::Text { selector: require_selector("text")? },
            "attr" => {
                let attribute = raw.value.ok_or("`attr` field requires `value` (the attribute name)")?;
                FieldKind::Attribute { selector: require_selector("attr")?, attribute }
            }
            "image" => FieldKind::Image { selector: require_selector("image")? },
            "var" => FieldKind::PageVariable { path: raw.value.ok_or("`var` field requires `value` (a meta path)")? },
            other => return Err(format!("unknown field type `{other}`")),
        };

        Ok(Self { kind, subtract: raw.subtract })
    }
}

/// Feed-channel metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelSpec {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub generator: Option<String>,
}

/// Feed-entry slot to field-name mapping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryMapping {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
}

impl EntryMapping {
    /// Every (slot, field name) pair that is mapped.
    pub fn slots(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("title", &self.title),
            ("link", &self.link),
            ("guid", &self.guid),
            ("description", &self.description),
            ("date", &self.date),
            ("cover", &self.cover),
        ]
        .into_iter()
        .filter_map(|(slot, field)| field.as_deref().map(|f| (slot, f)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub channel: ChannelSpec,
    #[serde(default)]
    pub items: EntryMapping,
}

fn version_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("version must be a string or number, got {other}"))),
    }
}
