//! DOM snapshot types for captured pages.
//!
//! A snapshot is a flat, document-ordered list of element nodes. The rendered
//! fetcher fills in layout boxes and computed styles from the live browser;
//! the static fetcher leaves boxes empty and approximates styles from inline
//! `style` attributes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A snapshot of a web page's DOM structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshot {
    /// The URL of the captured page
    pub url: Option<String>,
    /// The page title
    pub title: Option<String>,
    /// Flattened list of DOM nodes in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<DomNode>,
}

/// A single DOM element with its properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    /// Unique identifier for this node
    pub id: String,
    /// Lowercase HTML tag name (e.g., "div", "meta", "style")
    pub tag: String,
    /// IDs of child nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// ID of parent node
    #[serde(default)]
    pub parent: Option<String>,
    /// HTML attributes (id, class, data-*, etc.)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    /// Direct text content; full text for `<style>` and `<title>`
    #[serde(default)]
    pub text: Option<String>,
    /// Position and size on screen, when rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// CSS computed styles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_style: Option<ComputedStyle>,
}

impl DomNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }
}

/// Rectangle bounds for an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Computed CSS styles for a DOM element.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStyle {
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub line_height: Option<String>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub display: Option<String>,
    pub visibility: Option<String>,
}
