use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use super::{colors, fonts, named_fonts, OutputTarget, Theme};
use crate::analysis::color::to_oklch;
use crate::analysis::{ColorRecord, FontRecord};
use crate::plugins::{Capability, GenerationInput, Generator, OutputDestination, PluginSettings};
use crate::types::Artifact;
use crate::Result;

pub const FILE_NAME: &str = "styles.css";

const PALETTE_LIMIT: usize = 8;
const UTILITY_LIMIT: usize = 4;
const FONT_ROLES: [&str; 3] = ["primary", "secondary", "display"];

const FLUID_TEXT: [(&str, &str); 6] = [
    ("xs", "clamp(0.75rem, 2vw, 0.875rem)"),
    ("sm", "clamp(0.875rem, 2.5vw, 1rem)"),
    ("base", "clamp(1rem, 2.5vw, 1.125rem)"),
    ("lg", "clamp(1.125rem, 3vw, 1.25rem)"),
    ("xl", "clamp(1.25rem, 3.5vw, 1.5rem)"),
    ("2xl", "clamp(1.5rem, 4vw, 2rem)"),
];

const FLUID_SPACE: [(&str, &str); 5] = [
    ("xs", "clamp(0.25rem, 1vw, 0.5rem)"),
    ("sm", "clamp(0.5rem, 2vw, 1rem)"),
    ("md", "clamp(1rem, 3vw, 1.5rem)"),
    ("lg", "clamp(1.5rem, 4vw, 2rem)"),
    ("xl", "clamp(2rem, 5vw, 3rem)"),
];

const FEATURES: &str = r#"/* Container queries */
.card {
  container-type: inline-size;
  container-name: card;
}

@container card (min-width: 400px) {
  .card-content {
    display: grid;
    grid-template-columns: 1fr 2fr;
    gap: var(--space-md);
  }
}

/* Modern selectors */
.component:where(.primary, .secondary) {
  padding: var(--space-md);
  border-radius: 0.5rem;
}

.layout:has(.sidebar) .main-content {
  margin-inline-start: 250px;
}
"#;

/// Stylesheet using OKLCH colors, relative color variants, fluid type and
/// container queries.
pub struct ModernCssGenerator {
    id: String,
    target: OutputTarget,
}

impl ModernCssGenerator {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        Self {
            id: id.to_string(),
            target: OutputTarget::new(id, settings),
        }
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Generator(Arc::new(ModernCssGenerator::new(
        id, settings,
    ))))
}

#[async_trait]
impl Generator for ModernCssGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Modern CSS with OKLCH colors, fluid typography and container queries"
    }

    fn format(&self) -> &str {
        "modern-css"
    }

    async fn generate(
        &self,
        input: &GenerationInput<'_>,
        output: Option<&OutputDestination>,
    ) -> Result<Vec<Artifact>> {
        let content = stylesheet(input.url, &colors(input.data), &fonts(input.data));
        let artifact = self.target.emit(output, FILE_NAME, "text/css", content).await?;
        Ok(vec![artifact])
    }
}

pub(crate) fn stylesheet(url: &str, palette: &[ColorRecord], fonts: &[FontRecord]) -> String {
    let theme = Theme::from_records(palette);
    let colors: Vec<(&str, String)> = palette
        .iter()
        .take(PALETTE_LIMIT)
        .filter_map(|record| Some((record.hex.as_str(), to_oklch(&record.hex)?)))
        .collect();

    let mut out = format!(
        "/*\n * Modern CSS Design System\n * Generated from: {}\n */\n\n",
        url
    );
    out.push_str("*, *::before, *::after {\n  box-sizing: border-box;\n}\n\n");
    out.push_str("html {\n  font-size: clamp(1rem, 2.5vw, 1.125rem);\n}\n\n");

    out.push_str(":root {\n  /* Colors */\n");
    for (i, (hex, oklch)) in colors.iter().enumerate() {
        let var = format!("--color-{}", i + 1);
        let _ = writeln!(out, "  {}: {};", var, hex);
        let _ = writeln!(out, "  {}-oklch: {};", var, oklch);
        let _ = writeln!(out, "  {0}-light: oklch(from var({0}-oklch) calc(l + 0.2) c h);", var);
        let _ = writeln!(out, "  {0}-dark: oklch(from var({0}-oklch) calc(l - 0.2) c h);", var);
    }
    for (role, hex) in theme.roles() {
        if let Some(oklch) = to_oklch(hex) {
            let _ = writeln!(out, "  --color-{}: {};", role, oklch);
        }
    }

    let named = named_fonts(fonts);
    if !named.is_empty() {
        out.push_str("\n  /* Typography */\n");
        for (role, font) in FONT_ROLES.iter().zip(&named) {
            let _ = writeln!(out, "  --font-{}: {};", role, font.stack());
        }
    }
    out.push_str("\n  /* Fluid type scale */\n");
    for (name, value) in FLUID_TEXT {
        let _ = writeln!(out, "  --text-{}: {};", name, value);
    }
    out.push_str("\n  /* Fluid spacing */\n");
    for (name, value) in FLUID_SPACE {
        let _ = writeln!(out, "  --space-{}: {};", name, value);
    }
    out.push_str("}\n\n");

    let font = if named.is_empty() {
        "system-ui, sans-serif"
    } else {
        "var(--font-primary)"
    };
    let _ = write!(
        out,
        "body {{\n  background: var(--color-background);\n  color: var(--color-text);\n  font-family: {};\n  font-size: var(--text-base);\n  line-height: 1.6;\n}}\n\n",
        font
    );
    out.push_str(FEATURES);

    out.push_str("\n/* Utility classes */\n");
    for i in 1..=colors.len().min(UTILITY_LIMIT) {
        let _ = writeln!(out, ".bg-color-{0} {{ background: var(--color-{0}-oklch); }}", i);
        let _ = writeln!(out, ".text-color-{0} {{ color: var(--color-{0}-oklch); }}", i);
    }
    out.push_str(".text-fluid { font-size: var(--text-base); }\n");
    out.push_str(".text-responsive { font-size: clamp(1rem, 4vw, 2rem); }\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataBag;
    use serde_json::json;
    use tempfile::TempDir;

    fn bag() -> DataBag {
        let mut bag = DataBag::new();
        bag.insert(
            "colors",
            json!([
                {"hex": "#ff0000", "role": "primary", "count": 5},
                {"hex": "#ffffff", "role": "background", "count": 3},
                {"hex": "#000000", "role": "text", "count": 2}
            ]),
        );
        bag.insert(
            "fonts",
            json!([
                {"family": "Inter", "classification": "sans-serif", "fallback": "sans-serif"},
                {"family": "Georgia", "classification": "serif", "fallback": "serif"}
            ]),
        );
        bag
    }

    async fn inline(data: &DataBag) -> String {
        let artifacts = ModernCssGenerator::new("modern-css", &PluginSettings::default())
            .generate(&GenerationInput { url: "https://acme.test", data }, None)
            .await
            .unwrap();
        artifacts[0].content().unwrap().to_string()
    }

    #[tokio::test]
    async fn emits_oklch_palette_with_relative_variants() {
        let css = inline(&bag()).await;
        assert!(css.contains("Generated from: https://acme.test"));
        assert!(css.contains("  --color-1: #ff0000;"));
        assert!(css.contains("  --color-1-oklch: oklch(62.8% 0.25"));
        assert!(css.contains("  --color-1-light: oklch(from var(--color-1-oklch) calc(l + 0.2) c h);"));
        assert!(css.contains("  --color-2-oklch: oklch(100.0% 0.000 0.0);"));
        assert!(css.contains("  --color-background: oklch(100.0% 0.000 0.0);"));
        assert!(css.contains(".bg-color-3 { background: var(--color-3-oklch); }"));
        assert!(!css.contains(".bg-color-4"));
    }

    #[tokio::test]
    async fn fonts_fill_roles_in_order() {
        let css = inline(&bag()).await;
        assert!(css.contains("  --font-primary: Inter, sans-serif;"));
        assert!(css.contains("  --font-secondary: Georgia, serif;"));
        assert!(!css.contains("--font-display"));
        assert!(css.contains("font-family: var(--font-primary);"));
    }

    #[tokio::test]
    async fn empty_bag_keeps_scales_and_features() {
        let css = inline(&DataBag::new()).await;
        assert!(!css.contains("--color-1:"));
        assert!(css.contains("  --color-primary: oklch("));
        assert!(css.contains("  --text-base: clamp(1rem, 2.5vw, 1.125rem);"));
        assert!(css.contains("  --space-md: clamp(1rem, 3vw, 1.5rem);"));
        assert!(css.contains("@container card (min-width: 400px)"));
        assert!(css.contains("font-family: system-ui, sans-serif;"));
    }

    #[tokio::test]
    async fn writes_into_modern_css_subdir() {
        let dir = TempDir::new().expect("tempdir");
        let dest = OutputDestination::new(dir.path());
        let data = bag();
        ModernCssGenerator::new("modern-css", &PluginSettings::default())
            .generate(&GenerationInput { url: "https://acme.test", data: &data }, Some(&dest))
            .await
            .unwrap();
        let written =
            std::fs::read_to_string(dir.path().join("modern-css").join(FILE_NAME)).unwrap();
        assert!(written.contains(":root {"));
    }
}
