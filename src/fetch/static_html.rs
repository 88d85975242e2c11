use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::page::{FetchedPage, PageFetcher, SnapshotPage};
use crate::plugins::extractors::colors::color_tokens;
use crate::plugins::extractors::fonts::font_shorthand_family;
use crate::plugins::extractors::parse_declarations;
use crate::types::{ComputedStyle, DomNode, DomSnapshot};
use crate::{DsxError, Result};

/// Tags whose full text is kept rather than their direct text.
const FULL_TEXT_TAGS: [&str; 2] = ["style", "title"];

const SKIPPED_TAGS: [&str; 3] = ["script", "noscript", "template"];

/// Fetches raw HTML over HTTP without running scripts.
///
/// Only inline `style` attributes contribute computed styles, so stylesheet
/// colors and fonts reach extractors through `<style>` text instead.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<Box<dyn FetchedPage>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DsxError::fetch_failed(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DsxError::fetch_failed(format!(
                "GET {} returned status {}",
                url, status
            )));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| DsxError::fetch_failed(format!("Reading {} failed: {}", url, e)))?;

        let snapshot = parse_html(&body, final_url.as_str());
        debug!(url = %final_url, bytes = body.len(), nodes = snapshot.nodes.len(), "fetched static page");
        Ok(Box::new(SnapshotPage::new(snapshot)))
    }
}

/// Flattens an HTML document into a snapshot in document order.
pub(crate) fn parse_html(html: &str, url: &str) -> DomSnapshot {
    let document = Html::parse_document(html);
    let mut nodes = Vec::new();
    push_element(document.root_element(), None, &mut nodes);

    let title = nodes
        .iter()
        .find(|n| n.tag == "title")
        .and_then(|n| n.text.as_deref())
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty());

    DomSnapshot {
        url: Some(url.to_string()),
        title,
        nodes,
    }
}

fn push_element(element: ElementRef<'_>, parent: Option<&str>, nodes: &mut Vec<DomNode>) -> Option<String> {
    let tag = element.value().name().to_ascii_lowercase();
    if SKIPPED_TAGS.contains(&tag.as_str()) {
        return None;
    }

    let id = format!("n{}", nodes.len());
    let attributes: HashMap<String, String> = element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let text = if FULL_TEXT_TAGS.contains(&tag.as_str()) {
        element.text().collect::<String>()
    } else {
        let parts: Vec<&str> = element
            .children()
            .filter_map(|child| child.value().as_text())
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .collect();
        parts.join(" ")
    };
    let text = (!text.trim().is_empty()).then_some(text);

    let computed_style = attributes.get("style").and_then(|s| inline_style(s));

    let index = nodes.len();
    nodes.push(DomNode {
        id: id.clone(),
        tag,
        parent: parent.map(str::to_string),
        attributes,
        text,
        computed_style,
        ..DomNode::default()
    });

    let children: Vec<String> = element
        .children()
        .filter_map(ElementRef::wrap)
        .filter_map(|child| push_element(child, Some(id.as_str()), nodes))
        .collect();
    nodes[index].children = children;
    Some(id)
}

/// Approximates a computed style from an inline `style` attribute.
fn inline_style(style: &str) -> Option<ComputedStyle> {
    let mut computed = ComputedStyle::default();
    let mut found = false;
    for declaration in parse_declarations(style) {
        let slot = match declaration.property.as_str() {
            "font-family" => &mut computed.font_family,
            "font-size" => &mut computed.font_size,
            "font-weight" => &mut computed.font_weight,
            "line-height" => &mut computed.line_height,
            "color" => &mut computed.color,
            "background-color" => &mut computed.background_color,
            "border-color" => &mut computed.border_color,
            "display" => &mut computed.display,
            "visibility" => &mut computed.visibility,
            "background" | "border" => {
                let slot = if declaration.property == "background" {
                    &mut computed.background_color
                } else {
                    &mut computed.border_color
                };
                if let Some(token) = color_tokens(&declaration.value).next() {
                    slot.get_or_insert_with(|| token.to_string());
                    found = true;
                }
                continue;
            }
            "font" => {
                if let Some(family) = font_shorthand_family(&declaration.value) {
                    computed.font_family.get_or_insert(family);
                    found = true;
                }
                continue;
            }
            _ => continue,
        };
        *slot = Some(declaration.value);
        found = true;
    }
    found.then_some(computed)
}
