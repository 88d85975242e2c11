//! Page metadata and DOM shape.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use url::Url;

use crate::page::{Document, StyleQuery};
use crate::plugins::{Capability, Extractor, PluginSettings};
use crate::types::DomNode;
use crate::{DsxError, Result};

const SEMANTIC_TAGS: &[&str] = &[
    "header",
    "nav",
    "main",
    "section",
    "article",
    "aside",
    "footer",
    "figure",
    "figcaption",
    "time",
    "mark",
    "details",
    "summary",
];

const IMAGE_FORMATS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "webp", "avif"];

const TAG_DISTRIBUTION_LIMIT: usize = 20;
const CLASS_PREFIX_LIMIT: usize = 10;
const FORM_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureRecord {
    pub title: String,
    pub meta_description: String,
    pub meta_keywords: String,
    pub open_graph: BTreeMap<String, String>,
    pub headings: Vec<Heading>,
    pub semantic_elements: BTreeMap<String, usize>,
    pub dom: DomStats,
    pub google_fonts: Vec<GoogleFont>,
    pub forms: FormStats,
    pub media: MediaStats,
}

/// A heading and the lower-level headings that follow it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Heading>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomStats {
    pub total_elements: usize,
    pub class_count: usize,
    pub id_count: usize,
    pub tag_distribution: Vec<TagCount>,
    pub common_class_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoogleFont {
    pub family: String,
    pub weights: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormStats {
    pub form_count: usize,
    pub forms: Vec<FormSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub method: String,
    pub action: String,
    pub input_count: usize,
    pub input_types: BTreeMap<String, usize>,
    pub has_validation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStats {
    pub images: usize,
    pub images_with_alt: usize,
    pub lazy_images: usize,
    pub image_formats: BTreeMap<String, usize>,
    pub videos: usize,
    pub audios: usize,
    pub has_responsive_images: bool,
}

pub struct StructureExtractor {
    id: String,
}

impl StructureExtractor {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }

    pub fn analyze(&self, document: &Document) -> StructureRecord {
        StructureRecord {
            title: document.title().unwrap_or_default(),
            meta_description: document
                .meta_content("description")
                .or_else(|| document.meta_content("og:description"))
                .unwrap_or_default()
                .to_string(),
            meta_keywords: document
                .meta_content("keywords")
                .unwrap_or_default()
                .to_string(),
            open_graph: open_graph(document),
            headings: heading_hierarchy(document),
            semantic_elements: semantic_counts(document),
            dom: dom_stats(document),
            google_fonts: google_fonts(document),
            forms: form_stats(document),
            media: media_stats(document),
        }
    }
}

pub fn factory(id: &str, _settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Extractor(Arc::new(StructureExtractor::new(id))))
}

impl Extractor for StructureExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Page metadata, heading outline and DOM statistics"
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

fn open_graph(document: &Document) -> BTreeMap<String, String> {
    document
        .by_tag("meta")
        .filter_map(|meta| {
            let property = meta.attr("property")?.trim();
            let content = meta.attr("content")?.trim();
            (property.starts_with("og:") && !content.is_empty())
                .then(|| (property.to_string(), content.to_string()))
        })
        .collect()
}

fn heading_level(node: &DomNode) -> Option<u8> {
    let tag = node.tag.to_ascii_lowercase();
    let level = tag.strip_prefix('h')?.parse::<u8>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// Nests headings under the nearest preceding heading of a lower level.
fn heading_hierarchy(document: &Document) -> Vec<Heading> {
    let flat: Vec<Heading> = document
        .nodes()
        .filter_map(|node| {
            let level = heading_level(node)?;
            let text = document.text_content(node);
            (!text.is_empty()).then(|| Heading {
                level,
                text,
                id: node.attr("id").map(str::to_string),
                children: Vec::new(),
            })
        })
        .collect();

    let mut roots = Vec::new();
    let mut stack: Vec<Heading> = Vec::new();
    for heading in flat {
        while stack.last().map_or(false, |top| top.level >= heading.level) {
            close_heading(&mut stack, &mut roots);
        }
        stack.push(heading);
    }
    while !stack.is_empty() {
        close_heading(&mut stack, &mut roots);
    }
    roots
}

fn close_heading(stack: &mut Vec<Heading>, roots: &mut Vec<Heading>) {
    if let Some(done) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}

fn semantic_counts(document: &Document) -> BTreeMap<String, usize> {
    SEMANTIC_TAGS
        .iter()
        .filter_map(|tag| {
            let count = document.by_tag(tag).count();
            (count > 0).then(|| (tag.to_string(), count))
        })
        .collect()
}

fn dom_stats(document: &Document) -> DomStats {
    let mut tags: HashMap<String, usize> = HashMap::new();
    let mut classes = HashSet::new();
    let mut ids = HashSet::new();
    for node in document.nodes() {
        *tags.entry(node.tag.to_ascii_lowercase()).or_default() += 1;
        classes.extend(node.classes());
        if let Some(id) = node.attr("id").filter(|id| !id.is_empty()) {
            ids.insert(id);
        }
    }

    let mut tag_distribution: Vec<TagCount> = tags
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    tag_distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    tag_distribution.truncate(TAG_DISTRIBUTION_LIMIT);

    let mut prefixes: HashMap<&str, usize> = HashMap::new();
    for class in &classes {
        if let Some((prefix, _)) = class.split_once('-') {
            if !prefix.is_empty() {
                *prefixes.entry(prefix).or_default() += 1;
            }
        }
    }
    let mut prefixes: Vec<(&str, usize)> = prefixes.into_iter().collect();
    prefixes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    DomStats {
        total_elements: document.nodes().count(),
        class_count: classes.len(),
        id_count: ids.len(),
        tag_distribution,
        common_class_prefixes: prefixes
            .into_iter()
            .take(CLASS_PREFIX_LIMIT)
            .map(|(p, _)| p.to_string())
            .collect(),
    }
}

/// Families requested from Google Fonts by `<link>` tags or `@import` rules.
fn google_fonts(document: &Document) -> Vec<GoogleFont> {
    let links = document
        .by_tag("link")
        .filter_map(|link| link.attr("href"))
        .map(str::to_string);
    let imports = document.style_blocks().flat_map(import_urls);
    links
        .chain(imports)
        .filter(|href| href.contains("fonts.googleapis.com"))
        .flat_map(|href| parse_google_fonts_url(&href))
        .collect()
}

fn import_urls(css: &str) -> Vec<String> {
    css.split("@import")
        .skip(1)
        .filter_map(|rest| {
            let rest = rest.trim_start();
            let rest = rest.strip_prefix("url(").unwrap_or(rest);
            let rest = rest.trim_start_matches(['"', '\'']);
            let end = rest.find(['"', '\'', ')', ';'])?;
            Some(rest[..end].to_string())
        })
        .collect()
}

fn parse_google_fonts_url(href: &str) -> Vec<GoogleFont> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let Ok(url) = Url::parse(&absolute) else {
        return Vec::new();
    };
    url.query_pairs()
        .filter(|(key, _)| key == "family")
        .flat_map(|(_, value)| {
            value
                .split('|')
                .filter_map(|entry| {
                    let (name, axes) = entry.split_once(':').unwrap_or((entry, ""));
                    let family = name.replace('+', " ").trim().to_string();
                    if family.is_empty() {
                        return None;
                    }
                    // css2 style is `wght@400;700`, css1 style is `400,700`
                    let axes = axes.rsplit_once('@').map_or(axes, |(_, v)| v);
                    let weights = axes
                        .split([',', ';'])
                        .map(str::trim)
                        .filter(|w| !w.is_empty())
                        .map(str::to_string)
                        .collect();
                    Some(GoogleFont {
                        family,
                        weights,
                        url: href.to_string(),
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn descendants<'a>(document: &'a Document, root: &'a DomNode) -> Vec<&'a DomNode> {
    let mut out = Vec::new();
    let mut pending: Vec<&str> = root.children.iter().rev().map(String::as_str).collect();
    while let Some(id) = pending.pop() {
        if let Some(node) = document.node(id) {
            out.push(node);
            pending.extend(node.children.iter().rev().map(String::as_str));
        }
    }
    out
}

fn form_stats(document: &Document) -> FormStats {
    let forms: Vec<&DomNode> = document.by_tag("form").collect();
    let summaries = forms
        .iter()
        .take(FORM_LIMIT)
        .map(|form| {
            let inputs: Vec<&DomNode> = descendants(document, form)
                .into_iter()
                .filter(|n| {
                    matches!(
                        n.tag.to_ascii_lowercase().as_str(),
                        "input" | "select" | "textarea" | "button"
                    )
                })
                .collect();
            let mut input_types = BTreeMap::new();
            for input in &inputs {
                let kind = input
                    .attr("type")
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_else(|| input.tag.to_ascii_lowercase());
                *input_types.entry(kind).or_default() += 1;
            }
            FormSummary {
                method: form.attr("method").unwrap_or("GET").to_ascii_uppercase(),
                action: form.attr("action").unwrap_or_default().to_string(),
                input_count: inputs.len(),
                input_types,
                has_validation: inputs.iter().any(|n| n.attributes.contains_key("required")),
            }
        })
        .collect();
    FormStats {
        form_count: forms.len(),
        forms: summaries,
    }
}

fn media_stats(document: &Document) -> MediaStats {
    let images: Vec<&DomNode> = document.by_tag("img").collect();
    let mut image_formats = BTreeMap::new();
    for img in &images {
        let src = img.attr("src").unwrap_or_default();
        let path = src.split(['?', '#']).next().unwrap_or_default();
        if let Some((_, ext)) = path.rsplit_once('.') {
            let ext = ext.to_ascii_lowercase();
            if IMAGE_FORMATS.contains(&ext.as_str()) {
                *image_formats.entry(ext).or_default() += 1;
            }
        }
    }
    MediaStats {
        images: images.len(),
        images_with_alt: images
            .iter()
            .filter(|i| i.attr("alt").map_or(false, |a| !a.trim().is_empty()))
            .count(),
        lazy_images: images
            .iter()
            .filter(|i| i.attr("loading") == Some("lazy"))
            .count(),
        image_formats,
        videos: document.by_tag("video").count(),
        audios: document.by_tag("audio").count(),
        has_responsive_images: document.by_tag("picture").next().is_some()
            || images.iter().any(|i| i.attributes.contains_key("srcset")),
    }
}
