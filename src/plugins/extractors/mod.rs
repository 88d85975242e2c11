//! Built-in extractors and the CSS text helpers they share.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::page::Document;

pub mod branding;
pub mod colors;
pub mod css;
pub mod fonts;
pub mod structure;

pub use branding::BrandingExtractor;
pub use colors::ColorsExtractor;
pub use css::CssExtractor;
pub use fonts::FontsExtractor;
pub use structure::StructureExtractor;

/// A `property: value` pair found in page CSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declaration {
    pub property: String,
    pub value: String,
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid comment regex"))
}

fn declaration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(--[\w-]+|[a-zA-Z-]+)\s*:\s*([^;{}]+)").expect("valid declaration regex")
    })
}

/// Parses declarations out of a style sheet or a `style` attribute.
pub(crate) fn parse_declarations(css: &str) -> Vec<Declaration> {
    let cleaned = comment_re().replace_all(css, "");
    declaration_re()
        .captures_iter(&cleaned)
        .filter_map(|caps| {
            let property = caps.get(1)?.as_str().trim().to_ascii_lowercase();
            let value = caps.get(2)?.as_str().trim();
            let value = value
                .strip_suffix("!important")
                .unwrap_or(value)
                .trim()
                .to_string();
            (!value.is_empty()).then_some(Declaration { property, value })
        })
        .collect()
}

/// Declarations from `<style>` blocks and inline `style` attributes, in document order.
///
/// An inline `style` on a node that carries a computed style is skipped: its
/// values already reach extractors through the [`StyleQuery`](crate::page::StyleQuery).
pub(crate) fn page_declarations(document: &Document) -> Vec<Declaration> {
    let mut out = Vec::new();
    for node in document.nodes() {
        if node.tag.eq_ignore_ascii_case("style") {
            if let Some(text) = node.text.as_deref() {
                out.extend(parse_declarations(text));
            }
        }
        if node.computed_style.is_some() {
            continue;
        }
        if let Some(style) = node.attr("style") {
            out.extend(parse_declarations(style));
        }
    }
    out
}

/// Resolves `href` against the page URL; `None` for empty or unusable references.
pub(crate) fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    let scheme = href.get(..11).unwrap_or(href).to_ascii_lowercase();
    if href.is_empty() || scheme.starts_with("data:") || scheme.starts_with("javascript:") {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_declarations_and_skips_comments() {
        let decls = parse_declarations(
            "/* color: red; */ a:hover { color: #FFF !important; --brand-primary: #3b82f6 }",
        );
        let props: Vec<_> = decls.iter().map(|d| d.property.as_str()).collect();
        assert!(props.contains(&"color"));
        assert!(props.contains(&"--brand-primary"));
        assert!(!decls.iter().any(|d| d.value == "red"));
        let color = decls.iter().find(|d| d.property == "color").unwrap();
        assert_eq!(color.value, "#FFF");
    }

    #[test]
    fn absolute_url_joins_relative_paths() {
        let base = Url::parse("https://acme.test/about/").unwrap();
        assert_eq!(
            absolute_url(&base, "/img/logo.png").as_deref(),
            Some("https://acme.test/img/logo.png")
        );
        assert_eq!(
            absolute_url(&base, "team.jpg").as_deref(),
            Some("https://acme.test/about/team.jpg")
        );
        assert!(absolute_url(&base, "data:image/png;base64,AAAA").is_none());
        assert!(absolute_url(&base, "  ").is_none());
        assert!(absolute_url(&base, "JavaScript:void(0)").is_none());
    }

    #[test]
    fn page_declarations_skip_styles_already_computed() {
        use crate::types::{ComputedStyle, DomNode, DomSnapshot};

        let node = |id: &str, tag: &str, style: Option<&str>, computed: bool| {
            let mut node = DomNode {
                id: id.into(),
                tag: tag.into(),
                computed_style: computed.then(ComputedStyle::default),
                ..DomNode::default()
            };
            if let Some(style) = style {
                node.attributes.insert("style".into(), style.into());
            }
            node
        };
        let mut sheet = node("n0", "style", None, false);
        sheet.text = Some("a { color: blue }".into());
        let document = Document::new(DomSnapshot {
            url: None,
            title: None,
            nodes: vec![
                sheet,
                node("n1", "p", Some("color: red"), true),
                node("n2", "p", Some("color: green"), false),
            ],
        });
        let values: Vec<_> = page_declarations(&document)
            .into_iter()
            .map(|d| d.value)
            .collect();
        assert_eq!(values, vec!["blue", "green"]);
    }
}
