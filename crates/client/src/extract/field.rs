//! Field extraction: one scalar value per field specification.
//!
//! Every miss (no match, missing attribute, unknown page variable) yields
//! `None`; nothing here returns an error.

use std::collections::{BTreeMap, HashSet};

use scraper::{ElementRef, Html, Selector};

use sitefeed_core::sdd::{FieldKind, FieldSpec};

use super::select::{matching_descendants, parse_selector, parse_selectors, select, select_document, text_excluding};

/// Page-level values resolved once per document, keyed by `meta` entry name.
pub type PageValues = BTreeMap<String, Option<String>>;

#[derive(Debug)]
enum Rule {
    Text(Option<Selector>),
    Attribute(Option<Selector>, String),
    PageVariable(String),
}

/// A field specification with its selectors compiled.
#[derive(Debug)]
pub struct CompiledField {
    rule: Rule,
    subtract: Vec<Selector>,
}

impl CompiledField {
    pub fn compile(spec: &FieldSpec) -> Self {
        let rule = match &spec.kind {
            FieldKind::Text { selector } => Rule::Text(parse_selector(selector)),
            FieldKind::Attribute { selector, attribute } => Rule::Attribute(parse_selector(selector), attribute.clone()),
            FieldKind::Image { selector } => Rule::Attribute(parse_selector(selector), "src".to_string()),
            FieldKind::PageVariable { path } => {
                let name = path.strip_prefix("meta.").unwrap_or(path);
                Rule::PageVariable(name.to_string())
            }
        };
        Self { rule, subtract: parse_selectors(&spec.subtract) }
    }

    /// Extract the value of this field under `root`.
    ///
    /// Only the first match is read. Per-field subtract selectors hide
    /// matching descendants of that match from its text; the shared tree
    /// is left untouched so later fields still see them.
    pub fn extract(&self, root: ElementRef<'_>, page: &PageValues) -> Option<String> {
        match &self.rule {
            Rule::PageVariable(name) => page.get(name).cloned().flatten(),
            Rule::Text(selector) | Rule::Attribute(selector, _) => {
                let element = select(root, selector.as_ref()).into_iter().next()?;
                self.read(element)
            }
        }
    }

    /// Like [`CompiledField::extract`], but matches anywhere in `doc`,
    /// the root `<html>` element included.
    pub fn extract_document(&self, doc: &Html, page: &PageValues) -> Option<String> {
        match &self.rule {
            Rule::PageVariable(name) => page.get(name).cloned().flatten(),
            Rule::Text(selector) | Rule::Attribute(selector, _) => {
                let element = select_document(doc, selector.as_ref()).into_iter().next()?;
                self.read(element)
            }
        }
    }

    fn read(&self, element: ElementRef<'_>) -> Option<String> {
        match &self.rule {
            Rule::PageVariable(_) => None,
            Rule::Text(_) => {
                let excluded = if self.subtract.is_empty() {
                    HashSet::new()
                } else {
                    matching_descendants(element, &self.subtract)
                };
                Some(text_excluding(element, &excluded).trim().to_string())
            }
            Rule::Attribute(_, attribute) => element.value().attr(attribute).map(|v| v.trim().to_string()),
        }
    }
}

/// Extract one field under `root`, compiling its selectors on the spot.
pub fn extract_field(root: ElementRef<'_>, spec: &FieldSpec, page: &PageValues) -> Option<String> {
    CompiledField::compile(spec).extract(root, page)
}

/// Resolve every page metadata entry once against the whole document.
///
/// Page metadata cannot itself reference page variables, so an empty
/// value map is enough to evaluate it.
pub fn resolve_page_metadata(doc: &Html, specs: &BTreeMap<String, FieldSpec>) -> PageValues {
    let none = PageValues::new();
    specs
        .iter()
        .map(|(name, spec)| {
            let value = CompiledField::compile(spec).extract_document(doc, &none);
            tracing::debug!(name = %name, found = value.is_some(), "resolved page metadata");
            (name.clone(), value)
        })
        .collect()
}
