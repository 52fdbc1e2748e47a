//! HTML pages backed by the `scraper` crate.
//!
//! [`HtmlPage`] owns the parsed document; [`HtmlSnapshot`] is an arena over
//! its elements, keyed by document order, that implements [`Page`].

use scraper::{ElementRef, Html, Selector};

use super::{ElementKey, Page};
use crate::error::{PatternError, Result};

/// A parsed HTML document.
pub struct HtmlPage {
    html: Html,
}

impl HtmlPage {
    /// Parse a full HTML document. Parsing is lenient and never fails.
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// Index the document's elements for matching.
    pub fn snapshot(&self) -> HtmlSnapshot<'_> {
        HtmlSnapshot::new(&self.html)
    }
}

/// Element arena over a parsed [`HtmlPage`].
pub struct HtmlSnapshot<'a> {
    nodes: Vec<ElementRef<'a>>,
    parents: Vec<Option<ElementKey>>,
    children: Vec<Vec<ElementKey>>,
}

impl<'a> HtmlSnapshot<'a> {
    fn new(html: &'a Html) -> Self {
        let mut snapshot = Self {
            nodes: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
        };

        // Pre-order walk so keys follow document order.
        let mut stack: Vec<(ElementRef<'a>, Option<ElementKey>)> =
            vec![(html.root_element(), None)];
        while let Some((element, parent)) = stack.pop() {
            let key = ElementKey(snapshot.nodes.len());
            snapshot.nodes.push(element);
            snapshot.parents.push(parent);
            snapshot.children.push(Vec::new());
            if let Some(parent) = parent {
                snapshot.children[parent.0].push(key);
            }

            let kids: Vec<ElementRef<'a>> = element.children().filter_map(ElementRef::wrap).collect();
            for child in kids.into_iter().rev() {
                stack.push((child, Some(key)));
            }
        }

        snapshot
    }

    fn node(&self, key: ElementKey) -> &ElementRef<'a> {
        &self.nodes[key.0]
    }

    /// Look up elements by CSS selector anywhere in the document.
    pub fn find(&self, selector: &str) -> Result<Vec<ElementKey>> {
        self.select(self.root(), selector)
    }

    /// Outer HTML of an element, for display.
    pub fn outer_html(&self, key: ElementKey) -> String {
        self.node(key).html()
    }
}

impl Page for HtmlSnapshot<'_> {
    fn root(&self) -> ElementKey {
        ElementKey(0)
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn tag(&self, key: ElementKey) -> &str {
        self.node(key).value().name()
    }

    fn classes(&self, key: ElementKey) -> Vec<&str> {
        self.node(key).value().classes().collect()
    }

    fn attributes(&self, key: ElementKey) -> Vec<(&str, &str)> {
        self.node(key).value().attrs().collect()
    }

    fn text(&self, key: ElementKey) -> String {
        let raw: Vec<&str> = self.node(key).text().collect();
        crate::text::collapse_whitespace(&raw.join(" "))
    }

    fn parent(&self, key: ElementKey) -> Option<ElementKey> {
        self.parents[key.0]
    }

    fn children(&self, key: ElementKey) -> &[ElementKey] {
        &self.children[key.0]
    }

    fn select(&self, scope: ElementKey, selector: &str) -> Result<Vec<ElementKey>> {
        let parsed = Selector::parse(selector).map_err(|e| PatternError::SelectorInvalid {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;

        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|key| parsed.matches(self.node(*key)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_html() {
        let page = HtmlPage::parse("<p>hi</p>");
        let snap = page.snapshot();
        assert_eq!(snap.tag(snap.root()), "html");
        assert_eq!(snap.parent(snap.root()), None);
    }

    #[test]
    fn test_select_scoped_to_descendants() {
        let page = HtmlPage::parse(
            r#"<div class="a"><span>1</span></div><div class="b"><span>2</span><span>3</span></div>"#,
        );
        let snap = page.snapshot();
        let b = snap.find("div.b").unwrap()[0];
        let spans = snap.select(b, "span").unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(snap.text(spans[0]), "2");

        // The scope itself is never returned
        assert!(snap.select(b, "div").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let page = HtmlPage::parse("<p>hi</p>");
        let snap = page.snapshot();
        let err = snap.find("div..broken").unwrap_err();
        assert!(matches!(err, PatternError::SelectorInvalid { .. }));
    }

    #[test]
    fn test_text_collapses_whitespace_across_tags() {
        let page = HtmlPage::parse("<div id='x'>123  Main St<br>Springfield\n\t IL</div>");
        let snap = page.snapshot();
        let div = snap.find("#x").unwrap()[0];
        assert_eq!(snap.text(div), "123 Main St Springfield IL");
    }

    #[test]
    fn test_attributes_and_classes() {
        let page = HtmlPage::parse(r#"<a id="go" class="btn primary" href="/x">Go</a>"#);
        let snap = page.snapshot();
        let a = snap.find("a").unwrap()[0];
        let mut classes = snap.classes(a);
        classes.sort();
        assert_eq!(classes, vec!["btn", "primary"]);
        assert_eq!(snap.attribute(a, "href"), Some("/x"));
        assert_eq!(snap.attribute(a, "title"), None);
    }
}
