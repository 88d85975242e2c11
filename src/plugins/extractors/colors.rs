use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;
use url::Url;

use super::page_declarations;
use crate::analysis::color::{assign_roles, parse_color, ColorNormalizer};
use crate::page::{Document, StyleProperty, StyleQuery};
use crate::plugins::{Capability, Extractor, PluginSettings};
use crate::{DsxError, Result};

const STYLE_PROPERTIES: [StyleProperty; 3] = [
    StyleProperty::Color,
    StyleProperty::BackgroundColor,
    StyleProperty::BorderColor,
];

/// CSS properties whose values may carry colors.
fn is_color_property(property: &str) -> bool {
    matches!(
        property,
        "color"
            | "background"
            | "background-color"
            | "border"
            | "border-color"
            | "border-top"
            | "border-right"
            | "border-bottom"
            | "border-left"
            | "outline"
            | "outline-color"
            | "fill"
            | "stroke"
    ) || (property.starts_with("border-") && property.ends_with("-color"))
        || (property.starts_with("--") && property.contains("color"))
}

fn color_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"#[0-9a-fA-F]{3,8}\b|(?:rgba?|hsla?)\([^)]*\)|\b[a-zA-Z]+\b")
            .expect("valid color token regex")
    })
}

/// Color-looking tokens inside a CSS value, e.g. `1px solid #ccc` yields `#ccc`.
pub(crate) fn color_tokens(value: &str) -> impl Iterator<Item = &str> {
    color_token_re()
        .find_iter(value)
        .map(|m| m.as_str())
        .filter(|token| parse_color(token).is_some())
}

/// Palette of rendered colors, most frequent first, with roles.
pub struct ColorsExtractor {
    id: String,
    normalizer: ColorNormalizer,
}

impl ColorsExtractor {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        Self {
            id: id.to_string(),
            normalizer: ColorNormalizer::new(settings.max_colors),
        }
    }

    fn raw_colors(&self, document: &Document, styles: &dyn StyleQuery) -> Vec<String> {
        let mut raw: Vec<String> = STYLE_PROPERTIES
            .iter()
            .flat_map(|property| styles.computed_values(*property))
            .collect();
        for decl in page_declarations(document) {
            if is_color_property(&decl.property) {
                raw.extend(color_tokens(&decl.value).map(str::to_string));
            }
        }
        raw.retain(|value| {
            parse_color(value)
                .map(|c| !c.is_transparent())
                .unwrap_or(false)
        });
        raw
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Extractor(Arc::new(ColorsExtractor::new(
        id, settings,
    ))))
}

impl Extractor for ColorsExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Rendered color palette with frequency counts and palette roles"
    }

    fn extract(
        &self,
        document: &Document,
        styles: &dyn StyleQuery,
        _url: &Url,
    ) -> Result<serde_json::Value> {
        let raw = self.raw_colors(document, styles);
        let mut records = self.normalizer.normalize(&raw);
        assign_roles(&mut records);
        debug!(
            raw = raw.len(),
            unique = records.len(),
            "normalized page colors"
        );
        serde_json::to_value(records).map_err(|e| DsxError::extraction(&self.id, e.to_string()))
    }
}
