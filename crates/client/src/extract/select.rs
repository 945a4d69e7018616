//! Selector resolution and subtraction over a parsed document.
//!
//! Selectors are compiled once per extraction run. A selector that does not
//! parse is logged and then simply matches nothing.

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

/// Compile a selector, `None` if it does not parse.
pub fn parse_selector(text: &str) -> Option<Selector> {
    match Selector::parse(text) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::debug!(selector = text, error = %e, "selector does not parse; it will match nothing");
            None
        }
    }
}

/// Compile every selector that parses, dropping the rest.
pub fn parse_selectors(texts: &[String]) -> Vec<Selector> {
    texts.iter().filter_map(|text| parse_selector(text)).collect()
}

/// Elements under `root` matching `selector`, in document order.
///
/// `root` itself is never included. A missing selector matches nothing.
pub fn select<'a>(root: ElementRef<'a>, selector: Option<&Selector>) -> Vec<ElementRef<'a>> {
    selector.map(|s| root.select(s).collect()).unwrap_or_default()
}

/// Elements anywhere in the document matching `selector`, in document order.
pub fn select_document<'a>(doc: &'a Html, selector: Option<&Selector>) -> Vec<ElementRef<'a>> {
    selector.map(|s| doc.select(s).collect()).unwrap_or_default()
}

/// Ids of all descendants of `root` matching any of `selectors`.
pub fn matching_descendants(root: ElementRef<'_>, selectors: &[Selector]) -> HashSet<NodeId> {
    selectors
        .iter()
        .flat_map(|selector| root.select(selector).map(|el| el.id()))
        .collect()
}

/// Detach every descendant of `root` that matches any of `selectors`.
///
/// The tree is mutated in place, so later queries against `root` no longer
/// see the removed subtrees. `root` itself is never removed. Returns the
/// number of detached nodes.
pub fn subtract(doc: &mut Html, root: NodeId, selectors: &[Selector]) -> usize {
    if selectors.is_empty() {
        return 0;
    }

    let Some(element) = doc.tree.get(root).and_then(ElementRef::wrap) else {
        return 0;
    };
    let doomed = matching_descendants(element, selectors);

    let mut removed = 0;
    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
            removed += 1;
        }
    }
    removed
}

/// Text content of `element`, skipping any subtree rooted at an id in `excluded`.
pub fn text_excluding(element: ElementRef<'_>, excluded: &HashSet<NodeId>) -> String {
    use ego_tree::iter::Edge;
    use scraper::Node;

    let mut text = String::new();
    let mut skipping: Option<NodeId> = None;

    for edge in element.traverse() {
        match edge {
            Edge::Open(node) => {
                if skipping.is_some() {
                    continue;
                }
                if excluded.contains(&node.id()) {
                    skipping = Some(node.id());
                    continue;
                }
                if let Node::Text(t) = node.value() {
                    text.push_str(t);
                }
            }
            Edge::Close(node) => {
                if skipping == Some(node.id()) {
                    skipping = None;
                }
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <ul id="list">
            <li class="item"><h2>One</h2><div class="related"><h2>Related</h2></div></li>
            <li class="item"><h2>Two</h2><span class="ad">Buy</span></li>
        </ul>
    "#;

    fn texts(elements: &[ElementRef<'_>]) -> Vec<String> {
        elements.iter().map(|e| e.text().collect::<String>()).collect()
    }

    #[test]
    fn test_select_document_order() {
        let doc = Html::parse_document(HTML);
        let items = select_document(&doc, parse_selector(".item").as_ref());
        assert_eq!(items.len(), 2);

        let headings = select(items[0], parse_selector("h2").as_ref());
        assert_eq!(texts(&headings), vec!["One", "Related"]);
    }

    #[test]
    fn test_select_excludes_root() {
        let doc = Html::parse_document(HTML);
        let items = select_document(&doc, parse_selector(".item").as_ref());
        assert!(select(items[0], parse_selector(".item").as_ref()).is_empty());
    }

    #[test]
    fn test_malformed_selector_matches_nothing() {
        let doc = Html::parse_document(HTML);
        assert!(parse_selector("li[[[").is_none());
        assert!(select_document(&doc, parse_selector("li[[[").as_ref()).is_empty());
        assert_eq!(parse_selectors(&["h2".into(), "::::".into()]).len(), 1);
    }

    #[test]
    fn test_subtract_removes_nested_block() {
        let mut doc = Html::parse_document(HTML);
        let first = select_document(&doc, parse_selector(".item").as_ref())[0].id();

        let removed = subtract(&mut doc, first, &parse_selectors(&[".related".into()]));
        assert_eq!(removed, 1);

        let item = ElementRef::wrap(doc.tree.get(first).unwrap()).unwrap();
        let headings = select(item, parse_selector("h2").as_ref());
        assert_eq!(texts(&headings), vec!["One"]);
    }

    #[test]
    fn test_subtract_leaves_other_containers() {
        let mut doc = Html::parse_document(HTML);
        let items: Vec<NodeId> = select_document(&doc, parse_selector(".item").as_ref())
            .iter()
            .map(|e| e.id())
            .collect();

        subtract(&mut doc, items[0], &parse_selectors(&[".ad".into()]));

        let second = ElementRef::wrap(doc.tree.get(items[1]).unwrap()).unwrap();
        assert_eq!(select(second, parse_selector(".ad").as_ref()).len(), 1);
    }

    #[test]
    fn test_text_excluding() {
        let doc = Html::parse_document(HTML);
        let second = select_document(&doc, parse_selector(".item").as_ref())[1];
        let excluded = matching_descendants(second, &parse_selectors(&[".ad".into()]));
        assert_eq!(text_excluding(second, &excluded), "Two");
        assert_eq!(text_excluding(second, &HashSet::new()), "TwoBuy");
    }
}
