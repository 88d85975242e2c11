//! Raw Playwright capture output and its conversion into [`DomSnapshot`].

use crate::types::{BoundingBox, ComputedStyle, DomNode, DomSnapshot};
use std::collections::HashMap;

/// Raw script result with DOM snapshot from Playwright.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ScriptResultWithDom {
    pub status: String,
    pub dom: Option<RawDomSnapshot>,
}

/// Raw DOM snapshot as returned by the capture script.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDomSnapshot {
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub nodes: Vec<RawDomNode>,
}

/// Raw DOM node from Playwright output.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDomNode {
    pub id: String,
    pub tag: String,
    #[serde(default)]
    pub children: Vec<String>,
    pub parent: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub text: Option<String>,
    pub bounding_box: Option<RawBoundingBox>,
    pub computed_style: Option<RawComputedStyle>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct RawBoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Computed style strings; the script reports unset values as `""`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawComputedStyle {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub line_height: String,
    pub color: String,
    pub background_color: String,
    pub border_color: String,
    pub display: String,
    pub visibility: String,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Converts raw capture output into the crate's snapshot type.
///
/// Empty style strings become `None`; text is kept verbatim so `<style>`
/// blocks retain their formatting.
pub(crate) fn convert_raw_dom(dom_data: RawDomSnapshot) -> DomSnapshot {
    let nodes: Vec<DomNode> = dom_data
        .nodes
        .into_iter()
        .map(|raw| DomNode {
            id: raw.id,
            tag: raw.tag.to_ascii_lowercase(),
            children: raw.children,
            parent: raw.parent,
            attributes: raw.attributes,
            text: raw.text.filter(|t| !t.trim().is_empty()),
            bounding_box: raw.bounding_box.map(|b| BoundingBox {
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
            }),
            computed_style: raw.computed_style.map(|s| ComputedStyle {
                font_family: non_empty(s.font_family),
                font_size: non_empty(s.font_size),
                font_weight: non_empty(s.font_weight),
                line_height: non_empty(s.line_height),
                color: non_empty(s.color),
                background_color: non_empty(s.background_color),
                border_color: non_empty(s.border_color),
                display: non_empty(s.display),
                visibility: non_empty(s.visibility),
            }),
        })
        .collect();

    DomSnapshot {
        url: dom_data.url.and_then(non_empty),
        title: dom_data.title.and_then(non_empty),
        nodes,
    }
}
