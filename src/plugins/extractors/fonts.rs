use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::page_declarations;
use crate::analysis::{split_family_list, FontRecord};
use crate::page::{Document, StyleProperty, StyleQuery};
use crate::plugins::{Capability, Extractor, PluginSettings};
use crate::{DsxError, Result};

/// Font families in use, classified with a suggested fallback stack.
pub struct FontsExtractor {
    id: String,
}

impl FontsExtractor {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

pub fn factory(id: &str, _settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Extractor(Arc::new(FontsExtractor::new(id))))
}

/// Unique family tokens in first-seen order, compared case-insensitively.
fn unique_families<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .flat_map(|value| split_family_list(&value))
        .filter(|family| seen.insert(family.to_ascii_lowercase()))
        .collect()
}

impl Extractor for FontsExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Font families with classification and fallback stacks"
    }

    fn extract(
        &self,
        document: &Document,
        styles: &dyn StyleQuery,
        _url: &Url,
    ) -> Result<serde_json::Value> {
        let computed = styles.computed_values(StyleProperty::FontFamily);
        let declared = page_declarations(document)
            .into_iter()
            .filter(|d| d.property == "font-family" || d.property == "font")
            .filter_map(|d| {
                if d.property == "font" {
                    font_shorthand_family(&d.value)
                } else {
                    Some(d.value)
                }
            });

        let records: Vec<FontRecord> = unique_families(computed.into_iter().chain(declared))
            .iter()
            .map(|family| FontRecord::new(family))
            .collect();
        debug!(fonts = records.len(), "classified font families");
        serde_json::to_value(records).map_err(|e| DsxError::extraction(&self.id, e.to_string()))
    }
}

/// Family list of a `font` shorthand: whatever follows the size token.
pub(crate) fn font_shorthand_family(value: &str) -> Option<String> {
    let mut tokens = value.split_whitespace();
    let size_pos = tokens.position(|t| {
        t.starts_with(|c: char| c.is_ascii_digit() || c == '.')
            && (t.ends_with("px") || t.ends_with("em") || t.ends_with('%') || t.contains('/'))
    })?;
    let family: Vec<&str> = value.split_whitespace().skip(size_pos + 1).collect();
    (!family.is_empty()).then(|| family.join(" "))
}
