//! Structural validation of site definitions.
//!
//! Only the shape of the document is checked. Selector syntax is not:
//! a selector that does not parse simply matches nothing at extraction time.

use serde::Deserialize;

use super::{FieldKind, SiteDefinition};
use crate::Error;

/// Top-level keys every stored SDD must carry.
pub const REQUIRED_FIELDS: &[&str] = &["version", "url", "title", "data_list", "data_list_elements", "rss"];

/// Parse and validate an SDD from its JSON text.
pub fn parse_sdd(text: &str) -> Result<SiteDefinition, Error> {
    let raw: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::InvalidSdd(format!("not valid JSON: {e}")))?;
    validate(&raw)
}

/// Validate a raw SDD document and build the typed definition.
///
/// # Errors
///
/// Returns `Error::InvalidSdd` if:
/// - the document is not an object or lacks a required top-level field
/// - a field spec has an unknown type or is missing the data its type needs
/// - the item-list selector is empty
/// - the output mapping names a field that is not defined
/// - a page variable does not point at an existing `meta.<name>` entry
/// - a page metadata entry is itself a page variable
pub fn validate(raw: &serde_json::Value) -> Result<SiteDefinition, Error> {
    let object = raw.as_object().ok_or_else(|| Error::InvalidSdd("document must be a JSON object".into()))?;

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidSdd(format!("missing required fields: {}", missing.join(", "))));
    }

    let sdd = SiteDefinition::deserialize(raw).map_err(|e| Error::InvalidSdd(e.to_string()))?;

    if sdd.url.trim().is_empty() {
        return Err(Error::InvalidSdd("url must not be empty".into()));
    }

    if sdd.item_list.selector.css.trim().is_empty() {
        return Err(Error::InvalidSdd("data_list.selector.css must not be empty".into()));
    }

    for (slot, field) in sdd.output.items.slots() {
        if !sdd.fields.contains_key(field) {
            return Err(Error::InvalidSdd(format!("rss.items.{slot} references undefined field `{field}`")));
        }
    }

    for (name, spec) in &sdd.page_metadata {
        if matches!(spec.kind, FieldKind::PageVariable { .. }) {
            return Err(Error::InvalidSdd(format!("meta.{name} cannot be a page variable")));
        }
    }

    for (name, spec) in &sdd.fields {
        if let FieldKind::PageVariable { path } = &spec.kind {
            let meta_name = match path.split_once('.') {
                Some(("meta", meta_name)) if !meta_name.is_empty() => meta_name,
                _ => {
                    return Err(Error::InvalidSdd(format!(
                        "field `{name}` has page variable `{path}`; expected `meta.<name>`"
                    )));
                }
            };
            if !sdd.page_metadata.contains_key(meta_name) {
                return Err(Error::InvalidSdd(format!("field `{name}` references undefined meta entry `{meta_name}`")));
            }
        }
    }

    Ok(sdd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdd::FetchStrategy;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "version": "1.0",
            "url": "https://example.com/news",
            "title": "Example News",
            "favicon": "https://example.com/favicon.ico",
            "suggest_fetch_method": "headless",
            "encoding": "utf-8",
            "data_list": {"selector": {"css": ".article"}, "un_selectors": [".related"]},
            "data_list_elements": {
                "title": {"type": "text", "selector": {"css": "h2"}},
                "link": {"type": "attr", "selector": {"css": "a"}, "value": "href"},
                "author": {"type": "var", "value": "meta.author"}
            },
            "meta": {"author": {"type": "text", "selector": {"css": ".byline"}}},
            "rss": {
                "channel": {"title": "Example", "language": "en"},
                "items": {"title": "title", "link": "link"}
            }
        })
    }

    #[test]
    fn test_validate_sample() {
        let sdd = validate(&sample()).unwrap();
        assert_eq!(sdd.version, "1.0");
        assert_eq!(sdd.item_list.selector.css, ".article");
        assert_eq!(sdd.item_list.subtract, vec![".related".to_string()]);
        assert_eq!(sdd.fields.len(), 3);
        assert_eq!(sdd.fetch.strategy, FetchStrategy::Headless);
        assert_eq!(sdd.fetch.encoding.as_deref(), Some("utf-8"));
        assert_eq!(sdd.output.channel.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_validate_numeric_version() {
        let mut raw = sample();
        raw["version"] = json!(2);
        assert_eq!(validate(&raw).unwrap().version, "2");
    }

    #[test]
    fn test_validate_missing_fields() {
        let mut raw = sample();
        let object = raw.as_object_mut().unwrap();
        object.remove("rss");
        object.remove("version");

        let err = validate(&raw).unwrap_err();
        assert!(matches!(&err, Error::InvalidSdd(msg) if msg.contains("version") && msg.contains("rss")));
    }

    #[test]
    fn test_validate_not_object() {
        assert!(matches!(validate(&json!([1, 2])), Err(Error::InvalidSdd(_))));
    }

    #[test]
    fn test_validate_undefined_mapping_field() {
        let mut raw = sample();
        raw["rss"]["items"]["date"] = json!("published");
        let err = validate(&raw).unwrap_err();
        assert!(matches!(&err, Error::InvalidSdd(msg) if msg.contains("published")));
    }

    #[test]
    fn test_validate_bad_page_variable() {
        let mut raw = sample();
        raw["data_list_elements"]["author"]["value"] = json!("page.author");
        assert!(matches!(validate(&raw), Err(Error::InvalidSdd(_))));

        let mut raw = sample();
        raw["data_list_elements"]["author"]["value"] = json!("meta.editor");
        assert!(matches!(validate(&raw), Err(Error::InvalidSdd(msg)) if msg.contains("editor")));
    }

    #[test]
    fn test_validate_meta_cannot_be_variable() {
        let mut raw = sample();
        raw["meta"]["loop"] = json!({"type": "var", "value": "meta.author"});
        assert!(matches!(validate(&raw), Err(Error::InvalidSdd(_))));
    }

    #[test]
    fn test_validate_malformed_selector_is_accepted() {
        let mut raw = sample();
        raw["data_list_elements"]["title"]["selector"]["css"] = json!("h2[[[");
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn test_parse_sdd_invalid_json() {
        assert!(matches!(parse_sdd("{not json"), Err(Error::InvalidSdd(_))));
    }
}
