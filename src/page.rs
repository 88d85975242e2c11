//! Fetched-page abstractions shared by fetchers, plugins and the engine.
//!
//! A fetched page exposes two capabilities: a [`Document`] for tag, attribute
//! and text lookups, and a [`StyleQuery`] for resolved CSS values. The engine
//! owns the page for one run through a [`PageGuard`], which releases it on
//! every exit path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use url::Url;

use crate::types::{DomNode, DomSnapshot};
use crate::Result;

/// CSS properties plugins may query on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleProperty {
    Color,
    BackgroundColor,
    BorderColor,
    FontFamily,
    FontSize,
    FontWeight,
    LineHeight,
}

impl StyleProperty {
    pub fn css_name(self) -> &'static str {
        match self {
            StyleProperty::Color => "color",
            StyleProperty::BackgroundColor => "background-color",
            StyleProperty::BorderColor => "border-color",
            StyleProperty::FontFamily => "font-family",
            StyleProperty::FontSize => "font-size",
            StyleProperty::FontWeight => "font-weight",
            StyleProperty::LineHeight => "line-height",
        }
    }
}

impl fmt::Display for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

/// Resolved-style lookups against a rendering context.
pub trait StyleQuery: Send + Sync {
    /// Resolved value of `property` on the node with `node_id`.
    fn computed(&self, node_id: &str, property: StyleProperty) -> Option<String>;

    /// Every resolved value of `property`, one per styled element, in document order.
    fn computed_values(&self, property: StyleProperty) -> Vec<String>;
}

/// Read-only query wrapper over a captured DOM snapshot.
#[derive(Debug, Clone, Default)]
pub struct Document {
    snapshot: DomSnapshot,
    index: HashMap<String, usize>,
}

impl Document {
    pub fn new(snapshot: DomSnapshot) -> Self {
        let index = snapshot
            .nodes
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.id.clone(), pos))
            .collect();
        Self { snapshot, index }
    }

    pub fn snapshot(&self) -> &DomSnapshot {
        &self.snapshot
    }

    pub fn url(&self) -> Option<&str> {
        self.snapshot.url.as_deref()
    }

    /// Page title from the snapshot, else the first `<title>` element.
    pub fn title(&self) -> Option<String> {
        self.snapshot
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.by_tag("title")
                    .find_map(|n| n.text.as_deref().map(str::trim).filter(|t| !t.is_empty()))
                    .map(str::to_string)
            })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DomNode> {
        self.snapshot.nodes.iter()
    }

    pub fn node(&self, id: &str) -> Option<&DomNode> {
        self.index.get(id).map(|pos| &self.snapshot.nodes[*pos])
    }

    pub fn parent(&self, node: &DomNode) -> Option<&DomNode> {
        node.parent.as_deref().and_then(|id| self.node(id))
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DomNode> + 'a {
        self.nodes().filter(move |n| n.tag.eq_ignore_ascii_case(tag))
    }

    /// Content of the first `<meta>` whose `name` or `property` equals `key`.
    pub fn meta_content(&self, key: &str) -> Option<&str> {
        self.by_tag("meta").find_map(|meta| {
            let matches = ["name", "property"].iter().any(|attr| {
                meta.attr(attr)
                    .map(|v| v.trim().eq_ignore_ascii_case(key))
                    .unwrap_or(false)
            });
            if matches {
                meta.attr("content").map(str::trim).filter(|c| !c.is_empty())
            } else {
                None
            }
        })
    }

    /// `<link>` elements whose `rel` equals `rel` or lists it as a token.
    pub fn links_with_rel<'a>(&'a self, rel: &'a str) -> impl Iterator<Item = &'a DomNode> + 'a {
        self.by_tag("link").filter(move |link| {
            let value = link.attr("rel").unwrap_or_default().trim().to_ascii_lowercase();
            value == rel || (!rel.contains(' ') && value.split_whitespace().any(|t| t == rel))
        })
    }

    /// Text of every `<style>` block in document order.
    pub fn style_blocks(&self) -> impl Iterator<Item = &str> {
        self.by_tag("style").filter_map(|n| n.text.as_deref())
    }

    /// `(node, style attribute)` pairs for elements carrying inline styles.
    pub fn inline_styles(&self) -> impl Iterator<Item = (&DomNode, &str)> {
        self.nodes()
            .filter_map(|n| n.attr("style").map(|style| (n, style)))
    }

    /// Direct text of `node` and its descendants, whitespace-collapsed.
    pub fn text_content(&self, node: &DomNode) -> String {
        let mut parts = Vec::new();
        self.collect_text(node, &mut parts);
        parts.join(" ")
    }

    fn collect_text<'a>(&'a self, node: &'a DomNode, out: &mut Vec<&'a str>) {
        if let Some(text) = node.text.as_deref() {
            out.extend(text.split_whitespace());
        }
        for child in node.children.iter().filter_map(|id| self.node(id)) {
            self.collect_text(child, out);
        }
    }

    /// Whether any ancestor of `node` has the given tag.
    pub fn has_ancestor(&self, node: &DomNode, tag: &str) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent.tag.eq_ignore_ascii_case(tag) {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }
}

fn style_value(node: &DomNode, property: StyleProperty) -> Option<String> {
    let style = node.computed_style.as_ref()?;
    let value = match property {
        StyleProperty::Color => style.color.as_ref(),
        StyleProperty::BackgroundColor => style.background_color.as_ref(),
        StyleProperty::BorderColor => style.border_color.as_ref(),
        StyleProperty::FontFamily => style.font_family.as_ref(),
        StyleProperty::FontSize => style.font_size.as_ref(),
        StyleProperty::FontWeight => style.font_weight.as_ref(),
        StyleProperty::LineHeight => style.line_height.as_ref(),
    }?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl StyleQuery for Document {
    fn computed(&self, node_id: &str, property: StyleProperty) -> Option<String> {
        self.node(node_id).and_then(|n| style_value(n, property))
    }

    fn computed_values(&self, property: StyleProperty) -> Vec<String> {
        self.nodes()
            .filter_map(|n| style_value(n, property))
            .collect()
    }
}

/// A page held by the engine for the duration of one run.
pub trait FetchedPage: Send {
    fn document(&self) -> &Document;

    fn styles(&self) -> &dyn StyleQuery;

    /// Frees the rendering context. Called exactly once by [`PageGuard`].
    fn release(&mut self) {}
}

/// A page backed only by a captured snapshot; its document answers style queries.
#[derive(Debug)]
pub struct SnapshotPage {
    document: Document,
}

impl SnapshotPage {
    pub fn new(snapshot: DomSnapshot) -> Self {
        Self {
            document: Document::new(snapshot),
        }
    }
}

impl FetchedPage for SnapshotPage {
    fn document(&self) -> &Document {
        &self.document
    }

    fn styles(&self) -> &dyn StyleQuery {
        &self.document
    }
}

/// Loads a page for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Box<dyn FetchedPage>>;
}

/// Scoped owner of a fetched page; releases it when dropped.
pub struct PageGuard {
    page: Box<dyn FetchedPage>,
}

impl PageGuard {
    pub fn new(page: Box<dyn FetchedPage>) -> Self {
        Self { page }
    }
}

impl Deref for PageGuard {
    type Target = dyn FetchedPage;

    fn deref(&self) -> &Self::Target {
        self.page.as_ref()
    }
}

impl DerefMut for PageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.page.as_mut()
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.page.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComputedStyle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn node(id: &str, tag: &str, parent: Option<&str>, attrs: &[(&str, &str)]) -> DomNode {
        DomNode {
            id: id.to_string(),
            tag: tag.to_string(),
            parent: parent.map(str::to_string),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..DomNode::default()
        }
    }

    fn sample() -> Document {
        let mut body = node("n3", "body", Some("n0"), &[]);
        body.computed_style = Some(ComputedStyle {
            color: Some(" rgb(0, 0, 0) ".into()),
            font_family: Some("Arial".into()),
            ..ComputedStyle::default()
        });
        let mut title = node("n2", "title", Some("n1"), &[]);
        title.text = Some(" Acme ".into());
        Document::new(DomSnapshot {
            url: Some("https://acme.test/".into()),
            title: None,
            nodes: vec![
                node("n0", "html", None, &[]),
                node("n1", "head", Some("n0"), &[]),
                title,
                body,
                node("n4", "meta", Some("n1"), &[("property", "og:site_name"), ("content", "Acme Corp")]),
                node("n5", "link", Some("n1"), &[("rel", "Shortcut Icon"), ("href", "/fav.ico")]),
                node("n6", "link", Some("n1"), &[("rel", "icon preload"), ("href", "/a.png")]),
            ],
        })
    }

    #[test]
    fn document_queries_head_metadata() {
        let doc = sample();
        assert_eq!(doc.title().as_deref(), Some("Acme"));
        assert_eq!(doc.meta_content("OG:SITE_NAME"), Some("Acme Corp"));
        assert_eq!(doc.links_with_rel("shortcut icon").count(), 1);
        assert_eq!(doc.links_with_rel("icon").count(), 1);
        let meta = doc.node("n4").unwrap();
        assert!(doc.has_ancestor(meta, "html"));
        assert!(!doc.has_ancestor(meta, "body"));
    }

    #[test]
    fn document_answers_style_queries() {
        let doc = sample();
        assert_eq!(
            doc.computed("n3", StyleProperty::Color).as_deref(),
            Some("rgb(0, 0, 0)")
        );
        assert!(doc.computed("n0", StyleProperty::Color).is_none());
        assert_eq!(doc.computed_values(StyleProperty::FontFamily), vec!["Arial"]);
    }

    struct CountingPage {
        document: Document,
        released: Arc<AtomicUsize>,
    }

    impl FetchedPage for CountingPage {
        fn document(&self) -> &Document {
            &self.document
        }

        fn styles(&self) -> &dyn StyleQuery {
            &self.document
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_releases_page_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let guard = PageGuard::new(Box::new(CountingPage {
                document: sample(),
                released: released.clone(),
            }));
            assert!(guard.document().url().is_some());
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
