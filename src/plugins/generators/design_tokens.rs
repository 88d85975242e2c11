use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{
    colors, fonts, named_fonts, OutputTarget, DEFAULT_SEMANTIC_COLORS, RADIUS_SCALE, SHADOW_SCALE,
    SPACING_SCALE,
};
use crate::analysis::color::role_hex;
use crate::analysis::{ColorRecord, ColorRole, FontRecord};
use crate::plugins::{Capability, GenerationInput, Generator, OutputDestination, PluginSettings};
use crate::types::Artifact;
use crate::{DsxError, Result};

pub const FILE_NAME: &str = "design-tokens.json";

const PALETTE_LIMIT: usize = 20;
const MONOSPACE_STACK: [&str; 5] = ["SFMono-Regular", "Menlo", "Monaco", "Consolas", "monospace"];
const FONT_SIZES: [(&str, &str); 8] = [
    ("xs", "12px"),
    ("sm", "14px"),
    ("base", "16px"),
    ("lg", "18px"),
    ("xl", "20px"),
    ("2xl", "24px"),
    ("3xl", "30px"),
    ("4xl", "36px"),
];
const FONT_WEIGHTS: [(&str, &str); 5] = [
    ("light", "300"),
    ("normal", "400"),
    ("medium", "500"),
    ("semibold", "600"),
    ("bold", "700"),
];

/// Style Dictionary compatible token tree.
pub struct DesignTokensGenerator {
    id: String,
    target: OutputTarget,
}

impl DesignTokensGenerator {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        Self {
            id: id.to_string(),
            target: OutputTarget::new(id, settings),
        }
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Generator(Arc::new(DesignTokensGenerator::new(
        id, settings,
    ))))
}

#[async_trait]
impl Generator for DesignTokensGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Style Dictionary compatible design tokens"
    }

    fn format(&self) -> &str {
        "design-tokens"
    }

    async fn generate(
        &self,
        input: &GenerationInput<'_>,
        output: Option<&OutputDestination>,
    ) -> Result<Vec<Artifact>> {
        let tokens = build_tokens(&colors(input.data), &fonts(input.data));
        let content = serde_json::to_string_pretty(&tokens)
            .map_err(|e| DsxError::generation(&self.id, e.to_string()))?;
        let artifact = self
            .target
            .emit(output, FILE_NAME, "application/json", content)
            .await?;
        Ok(vec![artifact])
    }
}

fn token(value: impl Into<Value>) -> Value {
    json!({ "value": value.into() })
}

fn scale(entries: &[(&str, &str)]) -> Value {
    Value::Object(
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), token(*value)))
            .collect(),
    )
}

/// Role colors when assigned, otherwise palette order, otherwise the defaults.
fn semantic_colors(palette: &[ColorRecord]) -> Map<String, Value> {
    let roles = [
        Some(ColorRole::Primary),
        Some(ColorRole::Secondary),
        Some(ColorRole::Accent),
        None,
        None,
        None,
    ];
    DEFAULT_SEMANTIC_COLORS
        .iter()
        .zip(roles)
        .enumerate()
        .map(|(i, ((name, fallback), role))| {
            let hex = role
                .and_then(|r| role_hex(palette, r))
                .or_else(|| palette.get(i).map(|r| r.hex.as_str()))
                .unwrap_or(*fallback);
            (name.to_string(), token(hex))
        })
        .collect()
}

fn font_families(fonts: &[FontRecord]) -> Value {
    let named = named_fonts(fonts);
    let stack = |font: Option<&&FontRecord>| -> Vec<String> {
        font.map(|f| f.family.clone())
            .into_iter()
            .chain(["system-ui".to_string(), "sans-serif".to_string()])
            .collect()
    };
    json!({
        "primary": token(stack(named.first())),
        "secondary": token(stack(named.get(1))),
        "monospace": token(MONOSPACE_STACK.to_vec()),
    })
}

pub(crate) fn build_tokens(palette: &[ColorRecord], fonts: &[FontRecord]) -> Value {
    let palette_tokens: Map<String, Value> = palette
        .iter()
        .take(PALETTE_LIMIT)
        .enumerate()
        .map(|(i, record)| (format!("color-{}", i + 1), token(record.hex.as_str())))
        .collect();
    json!({
        "color": {
            "semantic": semantic_colors(palette),
            "palette": palette_tokens,
        },
        "font": {
            "family": font_families(fonts),
            "size": scale(&FONT_SIZES),
            "weight": scale(&FONT_WEIGHTS),
        },
        "spacing": { "scale": scale(&SPACING_SCALE) },
        "border": { "radius": scale(&RADIUS_SCALE) },
        "shadow": scale(&SHADOW_SCALE),
    })
}
