//! The extraction engine: SDD + HTML in, RSS out.
//!
//! One run:
//!
//! 1. parse the HTML
//! 2. resolve page metadata once against the whole document
//! 3. find the item containers and apply item-list subtraction to each
//! 4. extract every field of every container into an [`ItemRecord`]
//! 5. resolve link and image values against the SDD origin
//! 6. map records onto feed entries per the SDD output mapping
//! 7. serialize the channel and entries as RSS
//!
//! Nothing in a run returns an error. Selectors that match nothing, missing
//! attributes and unparseable dates all fall back to empty values or to
//! the run's clock.

use chrono::{DateTime, Utc};
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

use sitefeed_core::sdd::{EntryMapping, FieldKind, SiteDefinition};

use crate::extract::{
    CompiledField, ItemRecord, PageValues, normalize_url, parse_selector, parse_selectors, resolve_page_metadata,
    select_document, subtract,
};
use crate::feed::{Enclosure, Feed, FeedChannel, FeedEntry, parse_date};

/// Field names whose values are always treated as URLs.
const URL_FIELD_NAMES: &[&str] = &["link", "image"];

struct EngineField {
    name: String,
    rule: CompiledField,
    is_url: bool,
}

/// An SDD compiled for repeated runs.
///
/// Compiling parses every selector once; running never re-reads the SDD.
pub struct FeedEngine {
    sdd: SiteDefinition,
    item_selector: Option<Selector>,
    item_subtract: Vec<Selector>,
    fields: Vec<EngineField>,
}

impl FeedEngine {
    pub fn new(sdd: &SiteDefinition) -> Self {
        let fields = sdd
            .fields
            .iter()
            .map(|(name, spec)| EngineField {
                name: name.clone(),
                rule: CompiledField::compile(spec),
                is_url: URL_FIELD_NAMES.contains(&name.as_str()) || matches!(spec.kind, FieldKind::Image { .. }),
            })
            .collect();

        Self {
            sdd: sdd.clone(),
            item_selector: parse_selector(&sdd.item_list.selector.css),
            item_subtract: parse_selectors(&sdd.item_list.subtract),
            fields,
        }
    }

    pub fn sdd(&self) -> &SiteDefinition {
        &self.sdd
    }

    /// Run against `html` and serialize, using the wall clock for missing dates.
    pub fn run(&self, html: &str) -> String {
        self.run_at(html, Utc::now())
    }

    /// Run with an explicit clock. Identical inputs give identical output.
    pub fn run_at(&self, html: &str, now: DateTime<Utc>) -> String {
        self.build_feed(html, now).to_rss()
    }

    /// Run and return the feed model instead of its serialization.
    pub fn build_feed(&self, html: &str, now: DateTime<Utc>) -> Feed {
        let records = self.extract_records(html);
        let entries = records.iter().map(|record| self.to_entry(record, now)).collect();
        Feed { channel: self.channel(), entries }
    }

    /// Steps 1 to 5: one record per item container, in document order.
    pub fn extract_records(&self, html: &str) -> Vec<ItemRecord> {
        let mut doc = Html::parse_document(html);
        let page = resolve_page_metadata(&doc, &self.sdd.page_metadata);

        let containers: Vec<NodeId> = select_document(&doc, self.item_selector.as_ref())
            .iter()
            .map(|el| el.id())
            .collect();

        tracing::debug!(
            selector = %self.sdd.item_list.selector.css,
            count = containers.len(),
            "matched item containers"
        );

        for &container in &containers {
            subtract(&mut doc, container, &self.item_subtract);
        }

        containers
            .iter()
            .filter_map(|&id| doc.tree.get(id).and_then(ElementRef::wrap))
            .map(|container| self.extract_record(container, &page))
            .collect()
    }

    fn extract_record(&self, container: ElementRef<'_>, page: &PageValues) -> ItemRecord {
        self.fields
            .iter()
            .map(|field| {
                let value = field.rule.extract(container, page);
                let value = if field.is_url { value.map(|v| normalize_url(&v, &self.sdd.url)) } else { value };
                (field.name.clone(), value)
            })
            .collect()
    }

    fn to_entry(&self, record: &ItemRecord, now: DateTime<Utc>) -> FeedEntry {
        let mapping: &EntryMapping = &self.sdd.output.items;
        let slot = |field: &Option<String>| -> Option<String> {
            let name = field.as_deref()?;
            record.get(name).cloned().flatten().filter(|v| !v.trim().is_empty())
        };

        let link = slot(&mapping.link).map(|v| normalize_url(&v, &self.sdd.url));
        let id = slot(&mapping.guid).or_else(|| link.clone());
        let published = slot(&mapping.date).and_then(|v| parse_date(&v)).unwrap_or(now);
        let enclosure = slot(&mapping.cover).map(|v| Enclosure::image(normalize_url(&v, &self.sdd.url)));

        FeedEntry { title: slot(&mapping.title), id, link, description: slot(&mapping.description), published, enclosure }
    }

    fn channel(&self) -> FeedChannel {
        let channel = &self.sdd.output.channel;
        FeedChannel {
            title: channel.title.clone().unwrap_or_else(|| self.sdd.title.clone()),
            link: self.sdd.url.clone(),
            description: self.sdd.title.clone(),
            language: channel.language.clone(),
            generator: channel.generator.clone(),
            favicon: self.sdd.favicon.clone(),
        }
    }
}

/// Run `sdd` against `html` once.
pub fn run(sdd: &SiteDefinition, html: &str) -> String {
    FeedEngine::new(sdd).run(html)
}

/// [`run`] with an explicit clock.
pub fn run_at(sdd: &SiteDefinition, html: &str, now: DateTime<Utc>) -> String {
    FeedEngine::new(sdd).run_at(html, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sdd(raw: serde_json::Value) -> SiteDefinition {
        sitefeed_core::sdd::validate(&raw).unwrap()
    }

    fn article_sdd() -> SiteDefinition {
        sdd(json!({
            "version": "1.0",
            "url": "https://example.com",
            "title": "Example",
            "data_list": {"selector": {"css": ".article"}},
            "data_list_elements": {
                "title": {"type": "text", "selector": {"css": ".article h2"}},
                "link": {"type": "attr", "selector": {"css": ".article a"}, "value": "href"}
            },
            "rss": {"items": {"title": "title", "link": "link"}}
        }))
    }

    const ARTICLES: &str = r#"
        <div class="article"><h2>A</h2><a href="/a">read</a></div>
        <div class="article"><h2>B</h2><a href="/b">read</a></div>
    "#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_links_resolved() {
        let feed = FeedEngine::new(&article_sdd()).build_feed(ARTICLES, now());
        let links: Vec<_> = feed.entries.iter().map(|e| e.link.as_deref()).collect();
        assert_eq!(links, vec![Some("https://example.com/a"), Some("https://example.com/b")]);

        let titles: Vec<_> = feed.entries.iter().map(|e| e.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("A"), Some("B")]);
    }

    #[test]
    fn test_id_falls_back_to_link_and_date_to_now() {
        let feed = FeedEngine::new(&article_sdd()).build_feed(ARTICLES, now());
        assert_eq!(feed.entries[0].id.as_deref(), Some("https://example.com/a"));
        assert!(feed.entries.iter().all(|e| e.published == now()));
        assert!(feed.entries.iter().all(|e| e.enclosure.is_none()));
    }

    #[test]
    fn test_page_variable_shared_by_every_item() {
        let sdd = sdd(json!({
            "version": 1,
            "url": "https://example.com",
            "title": "Example",
            "data_list": {"selector": {"css": ".article"}},
            "data_list_elements": {
                "title": {"type": "text", "selector": {"css": "h2"}},
                "author": {"type": "var", "value": "meta.author"}
            },
            "meta": {"author": {"type": "text", "selector": {"css": "header .author"}}},
            "rss": {"items": {"title": "title", "description": "author"}}
        }));
        let html = r#"
            <header><span class="author">Jane Doe</span></header>
            <div class="article"><h2>A</h2><span class="author">Someone Else</span></div>
            <div class="article"><h2>B</h2></div>
        "#;

        let engine = FeedEngine::new(&sdd);
        let records = engine.extract_records(html);
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.get("author").cloned().flatten().as_deref(), Some("Jane Doe"));
        }

        let feed = engine.build_feed(html, now());
        assert!(feed.entries.iter().all(|e| e.description.as_deref() == Some("Jane Doe")));
    }

    #[test]
    fn test_entry_count_matches_containers() {
        let html: String = (0..7)
            .map(|i| format!(r#"<div class="article"><h2>{i}</h2><a href="/{i}">x</a></div>"#))
            .collect();
        let feed = FeedEngine::new(&article_sdd()).build_feed(&html, now());
        assert_eq!(feed.entries.len(), 7);
    }

    #[test]
    fn test_empty_and_unmatched_lists() {
        let engine = FeedEngine::new(&article_sdd());
        assert!(engine.build_feed("<p>nothing here</p>", now()).entries.is_empty());
        assert!(engine.build_feed("", now()).entries.is_empty());

        let xml = engine.run_at("<p>nothing here</p>", now());
        assert!(xml.contains("<channel>"));
        assert!(!xml.contains("<item>"));
    }

    #[test]
    fn test_malformed_item_selector_yields_empty_feed() {
        let mut sdd = article_sdd();
        sdd.item_list.selector.css = ".article[[[".into();
        assert!(FeedEngine::new(&sdd).build_feed(ARTICLES, now()).entries.is_empty());
    }

    #[test]
    fn test_idempotent_output() {
        let sdd = article_sdd();
        assert_eq!(run_at(&sdd, ARTICLES, now()), run_at(&sdd, ARTICLES, now()));
    }

    #[test]
    fn test_item_subtract_runs_before_fields() {
        let sdd = sdd(json!({
            "version": "1.0",
            "url": "https://example.com",
            "title": "Example",
            "data_list": {"selector": {"css": ".article"}, "un_selectors": [".related"]},
            "data_list_elements": {
                "title": {"type": "text", "selector": {"css": "h2"}},
                "link": {"type": "attr", "selector": {"css": "a"}, "value": "href"}
            },
            "rss": {"items": {"title": "title", "link": "link"}}
        }));
        let html = r#"
            <div class="article">
                <div class="related"><h2>Related</h2><a href="/related">r</a></div>
                <h2>Real</h2><a href="/real">read</a>
            </div>
        "#;

        let feed = FeedEngine::new(&sdd).build_feed(html, now());
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].title.as_deref(), Some("Real"));
        assert_eq!(feed.entries[0].link.as_deref(), Some("https://example.com/real"));
    }

    #[test]
    fn test_guid_date_and_cover_mapping() {
        let sdd = sdd(json!({
            "version": "1.0",
            "url": "https://example.com/list",
            "title": "Example",
            "favicon": "https://example.com/favicon.ico",
            "data_list": {"selector": {"css": "li"}},
            "data_list_elements": {
                "title": {"type": "text", "selector": {"css": "h3"}},
                "link": {"type": "attr", "selector": {"css": "a"}, "value": "href"},
                "id": {"type": "attr", "selector": {"css": "a"}, "value": "data-id"},
                "when": {"type": "text", "selector": {"css": "time"}},
                "thumb": {"type": "image", "selector": {"css": "img"}}
            },
            "rss": {
                "channel": {"title": "Custom", "language": "zh-cn", "generator": "test"},
                "items": {"title": "title", "link": "link", "guid": "id", "date": "when", "cover": "thumb"}
            }
        }));
        let html = r#"
            <ul>
                <li><h3>One</h3><a href="p/1" data-id="post-1">x</a><time>2024-02-01</time><img src="/i/1.png"></li>
                <li><h3>Two</h3><a href="p/2">x</a><time>someday</time></li>
            </ul>
        "#;

        let feed = FeedEngine::new(&sdd).build_feed(html, now());
        assert_eq!(feed.channel.title, "Custom");
        assert_eq!(feed.channel.description, "Example");
        assert_eq!(feed.channel.favicon.as_deref(), Some("https://example.com/favicon.ico"));

        let first = &feed.entries[0];
        assert_eq!(first.id.as_deref(), Some("post-1"));
        assert_eq!(first.link.as_deref(), Some("https://example.com/p/1"));
        assert_eq!(first.published, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(
            first.enclosure,
            Some(Enclosure { url: "https://example.com/i/1.png".into(), mime_type: "image/png".into() })
        );

        let second = &feed.entries[1];
        assert_eq!(second.id.as_deref(), Some("https://example.com/p/2"));
        assert_eq!(second.published, now());
        assert!(second.enclosure.is_none());
    }
}
