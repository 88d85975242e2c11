//! Built-in generators and the data-bag readers they share.
//!
//! Generators look extractor output up by the built-in extractor ids. A
//! missing or malformed entry is treated as "no data" and the generator falls
//! back to its defaults.

use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tracing::debug;

use crate::analysis::color::{darken, lighten, role_hex};
use crate::analysis::{ColorRecord, ColorRole, FontClass, FontRecord};
use crate::plugins::extractors::branding::BrandingRecord;
use crate::plugins::{OutputDestination, PluginSettings};
use crate::types::{Artifact, DataBag};
use crate::Result;

pub mod brand_assets;
pub mod css;
pub mod design_tokens;
pub mod html;
pub mod json;
pub mod modern_css;
pub mod tailwind;

pub use brand_assets::BrandAssetsGenerator;
pub use css::CssGenerator;
pub use design_tokens::DesignTokensGenerator;
pub use html::HtmlGenerator;
pub use json::JsonGenerator;
pub use modern_css::ModernCssGenerator;
pub use tailwind::TailwindGenerator;

pub const COLORS_KEY: &str = "colors";
pub const FONTS_KEY: &str = "fonts";
pub const BRANDING_KEY: &str = "branding";

/// Semantic colors used when the page yields fewer colors than roles.
pub const DEFAULT_SEMANTIC_COLORS: [(&str, &str); 6] = [
    ("primary", "#3b82f6"),
    ("secondary", "#64748b"),
    ("accent", "#06d6a0"),
    ("success", "#10b981"),
    ("warning", "#f59e0b"),
    ("error", "#ef4444"),
];

pub(crate) const DEFAULT_BACKGROUND: &str = "#ffffff";
pub(crate) const DEFAULT_TEXT: &str = "#111827";

/// Scale tokens shared by the CSS, design-token and Tailwind outputs.
pub(crate) const SPACING_SCALE: [(&str, &str); 6] = [
    ("xs", "0.25rem"),
    ("sm", "0.5rem"),
    ("md", "1rem"),
    ("lg", "1.5rem"),
    ("xl", "2rem"),
    ("2xl", "3rem"),
];

pub(crate) const RADIUS_SCALE: [(&str, &str); 4] = [
    ("sm", "0.25rem"),
    ("md", "0.5rem"),
    ("lg", "1rem"),
    ("full", "9999px"),
];

pub(crate) const SHADOW_SCALE: [(&str, &str); 4] = [
    ("sm", "0 1px 2px rgba(0, 0, 0, 0.1)"),
    ("md", "0 4px 6px rgba(0, 0, 0, 0.1)"),
    ("lg", "0 10px 15px rgba(0, 0, 0, 0.1)"),
    ("xl", "0 20px 25px rgba(0, 0, 0, 0.1)"),
];

fn entry<T: DeserializeOwned>(data: &DataBag, key: &str) -> Option<T> {
    let value = data.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(key, error = %e, "ignoring malformed data bag entry");
            None
        }
    }
}

pub(crate) fn colors(data: &DataBag) -> Vec<ColorRecord> {
    entry(data, COLORS_KEY).unwrap_or_default()
}

pub(crate) fn fonts(data: &DataBag) -> Vec<FontRecord> {
    entry(data, FONTS_KEY).unwrap_or_default()
}

pub(crate) fn branding(data: &DataBag) -> Option<BrandingRecord> {
    entry(data, BRANDING_KEY)
}

/// Resolved role colors, with defaults filling any gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Theme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
    pub primary_light: String,
    pub primary_dark: String,
}

impl Theme {
    pub fn from_records(records: &[ColorRecord]) -> Self {
        let pick = |role: ColorRole, fallback: &str| {
            role_hex(records, role).unwrap_or(fallback).to_string()
        };
        let primary = pick(ColorRole::Primary, DEFAULT_SEMANTIC_COLORS[0].1);
        Self {
            primary_light: lighten(&primary, 0.2).unwrap_or_else(|| primary.clone()),
            primary_dark: darken(&primary, 0.2).unwrap_or_else(|| primary.clone()),
            secondary: pick(ColorRole::Secondary, DEFAULT_SEMANTIC_COLORS[1].1),
            accent: pick(ColorRole::Accent, DEFAULT_SEMANTIC_COLORS[2].1),
            background: pick(ColorRole::Background, DEFAULT_BACKGROUND),
            text: pick(ColorRole::Text, DEFAULT_TEXT),
            primary,
        }
    }

    pub fn roles(&self) -> [(&'static str, &str); 5] {
        [
            ("primary", self.primary.as_str()),
            ("secondary", self.secondary.as_str()),
            ("accent", self.accent.as_str()),
            ("background", self.background.as_str()),
            ("text", self.text.as_str()),
        ]
    }
}

/// Named families worth emitting; drops CSS-wide keywords and generic families.
pub(crate) fn named_fonts(fonts: &[FontRecord]) -> Vec<&FontRecord> {
    fonts
        .iter()
        .filter(|f| f.classification != FontClass::CssKeyword)
        .filter(|f| !is_generic_family(&f.family))
        .collect()
}

fn is_generic_family(family: &str) -> bool {
    matches!(
        family.to_ascii_lowercase().as_str(),
        "serif"
            | "sans-serif"
            | "monospace"
            | "cursive"
            | "fantasy"
            | "system-ui"
            | "ui-serif"
            | "ui-sans-serif"
            | "ui-monospace"
            | "-apple-system"
    )
}

/// Where a generator writes, resolved once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputTarget {
    pub subdir: String,
    pub template: Option<PathBuf>,
}

impl OutputTarget {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        let configured = settings.generator(id);
        Self {
            subdir: configured.subdir.unwrap_or_else(|| id.to_string()),
            template: configured.template,
        }
    }

    /// Writes `content` under the destination, or returns it inline without one.
    pub async fn emit(
        &self,
        output: Option<&OutputDestination>,
        name: &str,
        media_type: &str,
        content: String,
    ) -> Result<Artifact> {
        match output {
            Some(dest) => {
                let path = dest.write(&self.subdir, name, content.as_bytes()).await?;
                debug!(path = %path.display(), "wrote artifact");
                Ok(Artifact::file(name, media_type, path))
            }
            None => Ok(Artifact::inline(name, media_type, content)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::GeneratorSettings;
    use serde_json::json;

    #[test]
    fn theme_falls_back_to_defaults() {
        let theme = Theme::from_records(&[]);
        assert_eq!(theme.primary, "#3b82f6");
        assert_eq!(theme.secondary, "#64748b");
        assert_eq!(theme.background, "#ffffff");
        assert_ne!(theme.primary_light, theme.primary);
        assert_ne!(theme.primary_dark, theme.primary);
    }

    #[test]
    fn theme_uses_assigned_roles() {
        let records = vec![
            ColorRecord {
                hex: "#ff6600".into(),
                role: Some(ColorRole::Primary),
                count: 4,
            },
            ColorRecord {
                hex: "#fafafa".into(),
                role: Some(ColorRole::Background),
                count: 2,
            },
        ];
        let theme = Theme::from_records(&records);
        assert_eq!(theme.primary, "#ff6600");
        assert_eq!(theme.background, "#fafafa");
        assert_eq!(theme.accent, "#06d6a0");
    }

    #[test]
    fn malformed_entries_read_as_empty() {
        let mut bag = DataBag::new();
        bag.insert(COLORS_KEY, json!({"not": "a list"}));
        bag.insert(FONTS_KEY, json!([{"family": "Inter", "classification": "sans-serif", "fallback": "sans-serif"}]));
        assert!(colors(&bag).is_empty());
        assert_eq!(fonts(&bag).len(), 1);
        assert!(branding(&bag).is_none());
    }

    #[test]
    fn named_fonts_skip_keywords_and_generics() {
        let fonts: Vec<FontRecord> = ["Inter", "sans-serif", "inherit", "Georgia"]
            .iter()
            .map(|f| FontRecord::new(f))
            .collect();
        let names: Vec<_> = named_fonts(&fonts).iter().map(|f| f.family.as_str()).collect();
        assert_eq!(names, vec!["Inter", "Georgia"]);
    }

    #[test]
    fn output_target_defaults_subdir_to_id() {
        let mut settings = PluginSettings::default();
        assert_eq!(OutputTarget::new("css", &settings).subdir, "css");
        settings.generators.insert(
            "css".into(),
            GeneratorSettings {
                template: None,
                subdir: Some("styles".into()),
            },
        );
        assert_eq!(OutputTarget::new("css", &settings).subdir, "styles");
    }
}
