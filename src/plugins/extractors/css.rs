//! Stylesheet rules, custom properties, modern feature usage and naming
//! conventions found in the page's own CSS.
//!
//! Only `<style>` blocks and inline `style` attributes are read. Linked
//! stylesheets are not fetched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};
use tracing::debug;
use url::Url;

use super::{comment_re, parse_declarations};
use crate::page::{Document, StyleQuery};
use crate::plugins::{Capability, Extractor, PluginSettings};
use crate::{DsxError, Result};

const CSS_TEXT_LIMIT: usize = 10_000;
const SELECTOR_LIMIT: usize = 100;
const PROPERTY_VALUE_LIMIT: usize = 10;
const AT_RULE_TEXT_LIMIT: usize = 500;
const MEDIA_QUERY_LIMIT: usize = 10;
const MEDIA_CONTENT_LIMIT: usize = 500;
const FEATURE_SAMPLE_LIMIT: usize = 20;

const LOGICAL_PROPERTIES: [&str; 8] = [
    "margin-inline",
    "margin-block",
    "padding-inline",
    "padding-block",
    "border-inline",
    "border-block",
    "inset-inline",
    "inset-block",
];

const OOCSS_OBJECTS: [&str; 5] = [".media", ".flag", ".nav", ".btn", ".card"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssRecord {
    /// Collected CSS, cut to the first 10k characters.
    pub css_text: String,
    pub rules: RuleSummary,
    pub custom_properties: BTreeMap<String, String>,
    /// Matches per detected feature; features with no matches are left out.
    pub modern_features: BTreeMap<String, Vec<String>>,
    pub architecture: Architecture,
    pub media_queries: Vec<MediaQuery>,
    pub total_css_size: usize,
    pub rule_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub selectors: Vec<String>,
    /// Distinct values seen per property.
    pub properties: BTreeMap<String, Vec<String>>,
    pub at_rules: Vec<AtRule>,
    pub selector_types: BTreeMap<String, usize>,
    pub property_usage: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRule {
    pub kind: String,
    pub css_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    pub methodology: Vec<String>,
    pub naming_patterns: BTreeMap<String, usize>,
    pub organization: Organization,
    pub complexity: Complexity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub has_comments: bool,
    pub has_sections: bool,
    pub import_count: usize,
    pub media_query_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complexity {
    pub selector_count: usize,
    pub property_count: usize,
    /// Mean number of whitespace-separated parts per selector.
    pub avg_selector_complexity: f64,
    pub lines_of_css: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaQuery {
    pub condition: String,
    pub content: String,
    pub rules_count: usize,
}

/// A top-level piece of a stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement<'a> {
    /// `prelude { body }`, where the prelude is a selector list or an at-rule.
    Block { prelude: &'a str, body: &'a str },
    /// An at-rule ended by `;`, such as `@import`.
    At(&'a str),
}

/// Splits comment-free CSS into top-level statements.
///
/// Braces inside strings are not special-cased; an unclosed block runs to
/// the end of the input.
fn statements(css: &str) -> Vec<Statement<'_>> {
    let bytes = css.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => {
                let text = css[start..i].trim();
                if text.starts_with('@') {
                    out.push(Statement::At(text));
                }
                start = i + 1;
            }
            b'{' => {
                let close = matching_brace(bytes, i);
                out.push(Statement::Block {
                    prelude: css[start..i].trim(),
                    body: &css[i + 1..close],
                });
                i = close;
                start = close + 1;
            }
            b'}' => start = i + 1,
            _ => {}
        }
        i += 1;
    }
    out
}

fn matching_brace(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    for (j, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return j;
                }
            }
            _ => {}
        }
    }
    bytes.len()
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn prelude_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^{};]+)\{").expect("valid prelude regex"))
}

fn leaf_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("valid leaf block regex"))
}

fn custom_property_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(--[a-zA-Z0-9_-]+)\s*:\s*([^;}]+)").expect("valid custom property regex")
    })
}

fn class_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.([a-zA-Z][\w-]*)").expect("valid class name regex"))
}

fn bem_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.[\w-]+__[\w-]+").expect("valid BEM regex"))
}

fn utility_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\.(?:text-\w|bg-\w|[pmw]-\d)").expect("valid utility class regex")
    })
}

fn section_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)/\*\s*={3,}.*?={3,}\s*\*/").expect("valid section comment regex")
    })
}

/// `(feature, pattern)` pairs searched over the whole collected CSS.
fn feature_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            ("container_queries", r"@container[^{;]*"),
            ("css_nesting", r"&[^{};]*\{"),
            ("has_selectors", r":has\([^)]*\)"),
            ("custom_properties", r"var\(--[^)]+\)"),
            ("fluid_typography", r"\b(?:clamp|min|max)\([^)]+\)"),
            ("color_functions", r"\b(?:oklch|lab|lch|color-mix|color)\([^)]+\)"),
            ("grid_areas", r"grid-template-areas\s*:\s*[^;}]+"),
        ]
        .into_iter()
        .map(|(name, pattern)| {
            (
                name,
                Regex::new(pattern).expect("valid modern feature regex"),
            )
        })
        .collect()
    })
}

/// CSS rules and conventions from the page's style blocks and inline styles.
pub struct CssExtractor {
    id: String,
}

impl CssExtractor {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }

    pub fn analyze(&self, document: &Document) -> CssRecord {
        let sheets = document.style_blocks().collect::<Vec<_>>().join("\n\n");
        let inline: Vec<&str> = document.inline_styles().map(|(_, style)| style).collect();
        let mut all = sheets.clone();
        for style in &inline {
            all.push('\n');
            all.push_str(style);
        }

        let stripped = comment_re().replace_all(&sheets, "");
        let rules = rule_summary(&stripped);
        let record = CssRecord {
            css_text: truncate(&all, CSS_TEXT_LIMIT),
            rule_count: rules.selectors.len(),
            custom_properties: custom_properties(&all),
            modern_features: modern_features(&all),
            architecture: Architecture {
                methodology: methodology(&stripped),
                naming_patterns: naming_patterns(&stripped),
                organization: organization(&sheets),
                complexity: complexity(&stripped, &sheets),
            },
            media_queries: media_queries(&stripped),
            total_css_size: all.len(),
            rules,
        };
        debug!(
            bytes = record.total_css_size,
            rules = record.rule_count,
            custom_properties = record.custom_properties.len(),
            "analyzed page css"
        );
        record
    }
}

pub fn factory(id: &str, _settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Extractor(Arc::new(CssExtractor::new(id))))
}

impl Extractor for CssExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "CSS rules, custom properties, modern features and naming conventions"
    }

    fn extract(
        &self,
        document: &Document,
        _styles: &dyn StyleQuery,
        _url: &Url,
    ) -> Result<serde_json::Value> {
        serde_json::to_value(self.analyze(document))
            .map_err(|e| DsxError::extraction(&self.id, e.to_string()))
    }
}

fn selector_type(selector: &str) -> &'static str {
    if selector.starts_with('#') {
        "id"
    } else if selector.starts_with('.') {
        "class"
    } else if selector.contains(':') {
        "pseudo"
    } else if selector.contains('[') {
        "attribute"
    } else {
        "element"
    }
}

fn at_rule_kind(prelude: &str) -> String {
    prelude
        .trim_start_matches('@')
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn rule_summary(css: &str) -> RuleSummary {
    let mut summary = RuleSummary::default();
    let mut selector_total = 0;
    for statement in statements(css) {
        match statement {
            Statement::Block { prelude, body } if prelude.starts_with('@') => {
                summary.at_rules.push(AtRule {
                    kind: at_rule_kind(prelude),
                    css_text: truncate(&format!("{} {{{}}}", prelude, body), AT_RULE_TEXT_LIMIT),
                });
            }
            Statement::Block { prelude, body } => {
                let selector = collapse_whitespace(prelude);
                if selector.is_empty() {
                    continue;
                }
                *summary
                    .selector_types
                    .entry(selector_type(&selector).to_string())
                    .or_default() += 1;
                selector_total += 1;
                if summary.selectors.len() < SELECTOR_LIMIT {
                    summary.selectors.push(selector);
                }
                for declaration in parse_declarations(body) {
                    *summary
                        .property_usage
                        .entry(declaration.property.clone())
                        .or_default() += 1;
                    let values = summary.properties.entry(declaration.property).or_default();
                    if values.len() < PROPERTY_VALUE_LIMIT && !values.contains(&declaration.value) {
                        values.push(declaration.value);
                    }
                }
            }
            Statement::At(text) => summary.at_rules.push(AtRule {
                kind: at_rule_kind(text),
                css_text: truncate(text, AT_RULE_TEXT_LIMIT),
            }),
        }
    }
    debug!(selectors = selector_total, "parsed top-level rules");
    summary
}

fn custom_properties(css: &str) -> BTreeMap<String, String> {
    custom_property_re()
        .captures_iter(css)
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
        .collect()
}

fn modern_features(css: &str) -> BTreeMap<String, Vec<String>> {
    let mut features = BTreeMap::new();
    for (name, pattern) in feature_patterns() {
        let mut seen = BTreeSet::new();
        let matches: Vec<String> = pattern
            .find_iter(css)
            .map(|m| m.as_str().trim_end_matches('{').trim().to_string())
            .filter(|m| seen.insert(m.clone()))
            .take(FEATURE_SAMPLE_LIMIT)
            .collect();
        if !matches.is_empty() {
            features.insert(name.to_string(), matches);
        }
    }
    let logical: Vec<String> = LOGICAL_PROPERTIES
        .iter()
        .filter(|property| css.contains(*property))
        .map(|property| property.to_string())
        .collect();
    if !logical.is_empty() {
        features.insert("logical_properties".into(), logical);
    }
    features
}

fn selector_preludes(css: &str) -> impl Iterator<Item = &str> {
    prelude_re()
        .captures_iter(css)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|prelude| !prelude.is_empty() && !prelude.starts_with('@'))
}

fn methodology(css: &str) -> Vec<String> {
    let mut found = Vec::new();
    if bem_re().is_match(css) {
        found.push("BEM".to_string());
    }
    if OOCSS_OBJECTS.iter().any(|object| css.contains(object)) {
        found.push("OOCSS".to_string());
    }
    if utility_re().is_match(css) {
        found.push("Utility-First".to_string());
    }
    found
}

/// Class names in selectors, counted by naming convention.
fn naming_patterns(css: &str) -> BTreeMap<String, usize> {
    let mut patterns: BTreeMap<String, usize> = ["camelCase", "kebab-case", "snake_case", "PascalCase"]
        .iter()
        .map(|name| (name.to_string(), 0))
        .collect();
    for prelude in selector_preludes(css) {
        for caps in class_name_re().captures_iter(prelude) {
            let class = &caps[1];
            let convention = if class.contains('_') {
                "snake_case"
            } else if class.contains('-') {
                "kebab-case"
            } else if class.starts_with(|c: char| c.is_ascii_uppercase()) {
                "PascalCase"
            } else if class.chars().skip(1).any(|c| c.is_ascii_uppercase()) {
                "camelCase"
            } else {
                continue;
            };
            *patterns.entry(convention.to_string()).or_default() += 1;
        }
    }
    patterns
}

fn organization(raw: &str) -> Organization {
    Organization {
        has_comments: comment_re().is_match(raw),
        has_sections: section_comment_re().is_match(raw),
        import_count: raw.matches("@import").count(),
        media_query_count: raw.matches("@media").count(),
    }
}

fn complexity(stripped: &str, raw: &str) -> Complexity {
    let parts: Vec<usize> = selector_preludes(stripped)
        .map(|prelude| prelude.split_whitespace().count())
        .collect();
    let avg = if parts.is_empty() {
        0.0
    } else {
        let mean = parts.iter().sum::<usize>() as f64 / parts.len() as f64;
        (mean * 100.0).round() / 100.0
    };
    Complexity {
        selector_count: parts.len(),
        property_count: leaf_block_re()
            .captures_iter(stripped)
            .map(|caps| parse_declarations(&caps[1]).len())
            .sum(),
        avg_selector_complexity: avg,
        lines_of_css: raw.lines().count(),
    }
}

fn media_queries(css: &str) -> Vec<MediaQuery> {
    statements(css)
        .into_iter()
        .filter_map(|statement| match statement {
            Statement::Block { prelude, body } if at_rule_kind(prelude) == "media" => {
                Some(MediaQuery {
                    condition: collapse_whitespace(prelude.trim_start_matches('@')["media".len()..].trim()),
                    content: truncate(body.trim(), MEDIA_CONTENT_LIMIT),
                    rules_count: leaf_block_re().find_iter(body).count(),
                })
            }
            _ => None,
        })
        .take(MEDIA_QUERY_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DomNode, DomSnapshot};

    const SHEET: &str = r#"
/* ===== Base ===== */
@import url("reset.css");
:root { --brand-primary: #3b82f6; --space-md: 1rem }
body { margin: 0; color: var(--brand-primary) }
.card__title--large { font-size: clamp(1rem, 2vw, 2rem) }
.navBar > .NavItem a:hover { color: oklch(70% 0.1 200) }
#main { padding-inline: 1rem; grid-template-areas: "head head" }
.btn_primary, .text-center { padding: 0.5rem; padding: 1rem }
input[type="text"] { border: 1px solid #ccc }
@media (max-width: 600px) {
  .card { padding: 0 }
  .btn { display: block }
}
@container sidebar (min-width: 400px) {
  .card { display: grid }
}
.card:has(img) { gap: 1rem }
"#;

    fn document(sheet: &str, inline: Option<&str>) -> Document {
        let mut nodes = vec![DomNode {
            id: "n0".into(),
            tag: "style".into(),
            text: Some(sheet.into()),
            ..DomNode::default()
        }];
        if let Some(style) = inline {
            let mut div = DomNode {
                id: "n1".into(),
                tag: "div".into(),
                ..DomNode::default()
            };
            div.attributes.insert("style".into(), style.into());
            nodes.push(div);
        }
        Document::new(DomSnapshot {
            url: None,
            title: None,
            nodes,
        })
    }

    fn analyze(sheet: &str, inline: Option<&str>) -> CssRecord {
        CssExtractor::new("css").analyze(&document(sheet, inline))
    }

    #[test]
    fn splits_top_level_statements() {
        let parsed = statements("@charset \"utf-8\"; a { b: c } @media x { d { e: f } } g{");
        assert_eq!(
            parsed,
            vec![
                Statement::At("@charset \"utf-8\""),
                Statement::Block { prelude: "a", body: " b: c " },
                Statement::Block { prelude: "@media x", body: " d { e: f } " },
                Statement::Block { prelude: "g", body: "" },
            ]
        );
    }

    #[test]
    fn summarizes_rules_and_selector_types() {
        let record = analyze(SHEET, None);
        let rules = &record.rules;
        assert_eq!(record.rule_count, 8);
        assert_eq!(rules.selectors[0], ":root");
        assert_eq!(rules.selector_types.get("class"), Some(&4));
        assert_eq!(rules.selector_types.get("pseudo"), Some(&1));
        assert_eq!(rules.selector_types.get("id"), Some(&1));
        assert_eq!(rules.selector_types.get("attribute"), Some(&1));
        assert_eq!(rules.selector_types.get("element"), Some(&1));
        assert_eq!(rules.property_usage.get("padding"), Some(&2));
        assert_eq!(
            rules.properties.get("padding"),
            Some(&vec!["0.5rem".to_string(), "1rem".to_string()])
        );
        let kinds: Vec<_> = rules.at_rules.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["import", "media", "container"]);
    }

    #[test]
    fn collects_custom_properties_including_inline() {
        let record = analyze(SHEET, Some("--accent-color: #ff6600; color: red"));
        assert_eq!(
            record.custom_properties.get("--brand-primary").map(String::as_str),
            Some("#3b82f6")
        );
        assert_eq!(
            record.custom_properties.get("--accent-color").map(String::as_str),
            Some("#ff6600")
        );
        assert!(record.css_text.ends_with("color: red"));
        assert_eq!(record.total_css_size, record.css_text.len());
    }

    #[test]
    fn detects_modern_features() {
        let features = analyze(SHEET, None).modern_features;
        assert_eq!(
            features["container_queries"],
            vec!["@container sidebar (min-width: 400px)"]
        );
        assert_eq!(features["has_selectors"], vec![":has(img)"]);
        assert_eq!(features["custom_properties"], vec!["var(--brand-primary)"]);
        assert_eq!(features["fluid_typography"], vec!["clamp(1rem, 2vw, 2rem)"]);
        assert_eq!(features["color_functions"], vec!["oklch(70% 0.1 200)"]);
        assert_eq!(features["logical_properties"], vec!["padding-inline"]);
        assert!(features.contains_key("grid_areas"));
        assert!(!features.contains_key("css_nesting"));
    }

    #[test]
    fn reads_methodology_naming_and_organization() {
        let architecture = analyze(SHEET, None).architecture;
        assert_eq!(architecture.methodology, vec!["BEM", "OOCSS", "Utility-First"]);
        assert_eq!(architecture.naming_patterns["camelCase"], 1);
        assert_eq!(architecture.naming_patterns["PascalCase"], 1);
        assert_eq!(architecture.naming_patterns["snake_case"], 2);
        assert!(architecture.organization.has_comments);
        assert!(architecture.organization.has_sections);
        assert_eq!(architecture.organization.import_count, 1);
        assert_eq!(architecture.organization.media_query_count, 1);
        assert!(architecture.complexity.selector_count >= 9);
        assert!(architecture.complexity.avg_selector_complexity >= 1.0);
    }

    #[test]
    fn extracts_media_queries() {
        let queries = analyze(SHEET, None).media_queries;
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].condition, "(max-width: 600px)");
        assert_eq!(queries[0].rules_count, 2);
        assert!(queries[0].content.starts_with(".card { padding: 0 }"));
    }

    #[test]
    fn page_without_css_yields_empty_record() {
        let record = CssExtractor::new("css").analyze(&Document::new(DomSnapshot {
            url: None,
            title: None,
            nodes: Vec::new(),
        }));
        assert_eq!(record.rule_count, 0);
        assert_eq!(record.total_css_size, 0);
        assert!(record.modern_features.is_empty());
        assert!(record.architecture.methodology.is_empty());
        assert_eq!(record.architecture.complexity.avg_selector_complexity, 0.0);
    }
}
