//! Read-only view of a page's element tree.
//!
//! The matching engine never owns elements. It addresses them through
//! [`ElementKey`]s handed out by a [`Page`], and any state the tool keeps about
//! an element (sample, matched, excluded) lives outside the tree.

pub mod html;

pub use html::{HtmlPage, HtmlSnapshot};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Stable handle to an element of a page snapshot.
///
/// Keys are assigned in document order, so ordering keys orders elements by
/// their position in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementKey(pub usize);

impl ElementKey {
    /// Position of the element in document order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// One step of an [`ElementPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub tag: String,

    /// 1-based position among the parent's element children.
    pub position: usize,
}

/// Positional path of an element from the document root.
///
/// Two elements share a path only if they sit at the same position of the same
/// tree shape, which makes the path usable as an element identity across
/// re-parses of an unchanged page.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementPath(pub Vec<PathSegment>);

impl ElementPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            if i == 0 {
                f.write_str(&segment.tag)?;
            } else {
                write!(f, "{}:nth-child({})", segment.tag, segment.position)?;
            }
        }
        Ok(())
    }
}

/// Capability the matcher needs from a page: read element structure and run
/// structural selector queries.
///
/// Accessors index by key and panic on keys the page did not issue, the same
/// way slice indexing does. Callers validate foreign keys with
/// [`Page::contains`] first.
pub trait Page {
    /// The document element.
    fn root(&self) -> ElementKey;

    /// Number of elements in the snapshot.
    fn len(&self) -> usize;

    fn tag(&self, key: ElementKey) -> &str;

    fn classes(&self, key: ElementKey) -> Vec<&str>;

    /// Attribute name/value pairs. Order is unspecified.
    fn attributes(&self, key: ElementKey) -> Vec<(&str, &str)>;

    /// Visible text of the element and its descendants, whitespace-collapsed.
    fn text(&self, key: ElementKey) -> String;

    fn parent(&self, key: ElementKey) -> Option<ElementKey>;

    /// Element children in document order.
    fn children(&self, key: ElementKey) -> &[ElementKey];

    /// Descendants of `scope` (excluding `scope`) matching a CSS selector, in
    /// document order.
    fn select(&self, scope: ElementKey, selector: &str) -> Result<Vec<ElementKey>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, key: ElementKey) -> bool {
        key.0 < self.len()
    }

    fn attribute(&self, key: ElementKey, name: &str) -> Option<&str> {
        self.attributes(key)
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// All descendants of `scope` in document order, `scope` excluded.
    fn descendants(&self, scope: ElementKey) -> Vec<ElementKey> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementKey> = self.children(scope).iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            out.push(key);
            stack.extend(self.children(key).iter().rev().copied());
        }
        out
    }

    /// Ancestors of `key`, nearest first.
    fn ancestors(&self, key: ElementKey) -> Vec<ElementKey> {
        let mut out = Vec::new();
        let mut current = self.parent(key);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Whether `ancestor` strictly contains `key`.
    fn is_ancestor(&self, ancestor: ElementKey, key: ElementKey) -> bool {
        let mut current = self.parent(key);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Positional path from the root down to `key`.
    fn path(&self, key: ElementKey) -> ElementPath {
        let mut chain: Vec<ElementKey> = self.ancestors(key);
        chain.reverse();
        chain.push(key);

        let segments = chain
            .into_iter()
            .map(|k| {
                let position = match self.parent(k) {
                    Some(parent) => self
                        .children(parent)
                        .iter()
                        .position(|c| *c == k)
                        .map_or(1, |i| i + 1),
                    None => 1,
                };
                PathSegment {
                    tag: self.tag(k).to_string(),
                    position,
                }
            })
            .collect();
        ElementPath(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <ul id="list">
            <li>One</li>
            <li>Two <b>bold</b></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_descendants_in_document_order() {
        let page = HtmlPage::parse(PAGE);
        let snap = page.snapshot();
        let tags: Vec<_> = snap
            .descendants(snap.root())
            .into_iter()
            .map(|k| snap.tag(k).to_string())
            .collect();
        assert_eq!(tags, vec!["head", "body", "ul", "li", "li", "b"]);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let page = HtmlPage::parse(PAGE);
        let snap = page.snapshot();
        let bold = snap.select(snap.root(), "b").unwrap()[0];
        let tags: Vec<_> = snap
            .ancestors(bold)
            .into_iter()
            .map(|k| snap.tag(k).to_string())
            .collect();
        assert_eq!(tags, vec!["li", "ul", "body", "html"]);
    }

    #[test]
    fn test_path_display() {
        let page = HtmlPage::parse(PAGE);
        let snap = page.snapshot();
        let second = snap.select(snap.root(), "li").unwrap()[1];
        assert_eq!(
            snap.path(second).to_string(),
            "html > body:nth-child(2) > ul:nth-child(1) > li:nth-child(2)"
        );
    }

    #[test]
    fn test_paths_distinguish_siblings() {
        let page = HtmlPage::parse(PAGE);
        let snap = page.snapshot();
        let items = snap.select(snap.root(), "li").unwrap();
        assert_ne!(snap.path(items[0]), snap.path(items[1]));
        assert_eq!(snap.path(items[0]), snap.path(items[0]));
    }

    #[test]
    fn test_is_ancestor_is_strict() {
        let page = HtmlPage::parse(PAGE);
        let snap = page.snapshot();
        let list = snap.select(snap.root(), "#list").unwrap()[0];
        let item = snap.select(snap.root(), "li").unwrap()[0];
        assert!(snap.is_ancestor(list, item));
        assert!(!snap.is_ancestor(item, list));
        assert!(!snap.is_ancestor(list, list));
    }
}
