use async_trait::async_trait;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;

use super::{
    colors, fonts, named_fonts, OutputTarget, Theme, RADIUS_SCALE, SHADOW_SCALE, SPACING_SCALE,
};
use crate::analysis::{ColorRecord, FontRecord};
use crate::plugins::{Capability, GenerationInput, Generator, OutputDestination, PluginSettings};
use crate::template::{PlaceholderRenderer, TemplateRenderer};
use crate::types::Artifact;
use crate::{DsxError, Result};

pub const FILE_NAME: &str = "styles.css";

const PALETTE_LIMIT: usize = 12;
const PALETTE_UTILITY_LIMIT: usize = 8;
const FONT_LIMIT: usize = 6;
const SEMANTIC_FONTS: [&str; 3] = ["primary", "secondary", "accent"];

const TYPE_SCALE: [(&str, &str, &str); 8] = [
    ("xs", "0.75rem", "1rem"),
    ("sm", "0.875rem", "1.25rem"),
    ("base", "1rem", "1.5rem"),
    ("lg", "1.125rem", "1.75rem"),
    ("xl", "1.25rem", "1.75rem"),
    ("2xl", "1.5rem", "2rem"),
    ("3xl", "1.875rem", "2.25rem"),
    ("4xl", "2.25rem", "2.5rem"),
];

/// CSS custom properties plus color, typography and component utilities.
pub struct CssGenerator {
    id: String,
    target: OutputTarget,
    renderer: Arc<dyn TemplateRenderer>,
}

impl CssGenerator {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        Self::with_renderer(id, settings, Arc::new(PlaceholderRenderer))
    }

    pub fn with_renderer(
        id: &str,
        settings: &PluginSettings,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            id: id.to_string(),
            target: OutputTarget::new(id, settings),
            renderer,
        }
    }

    async fn render(&self, sheet: &StyleSheet<'_>, url: &str) -> Result<String> {
        let Some(path) = &self.target.template else {
            return Ok(sheet.to_css(url));
        };
        let template = tokio::fs::read_to_string(path).await.map_err(|e| {
            DsxError::Template(format!("cannot read template {}: {}", path.display(), e))
        })?;
        self.renderer.render(&template, &sheet.context(url))
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Generator(Arc::new(CssGenerator::new(id, settings))))
}

#[async_trait]
impl Generator for CssGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "CSS custom properties and utility classes"
    }

    fn format(&self) -> &str {
        "css"
    }

    async fn generate(
        &self,
        input: &GenerationInput<'_>,
        output: Option<&OutputDestination>,
    ) -> Result<Vec<Artifact>> {
        let palette = colors(input.data);
        let fonts = fonts(input.data);
        let sheet = StyleSheet::new(&palette, &fonts);
        let content = self
            .render(&sheet, input.url)
            .await
            .map_err(|e| DsxError::generation(&self.id, e.to_string()))?;
        let artifact = self.target.emit(output, FILE_NAME, "text/css", content).await?;
        Ok(vec![artifact])
    }
}

/// Everything the stylesheet is built from.
struct StyleSheet<'a> {
    palette: &'a [ColorRecord],
    fonts: Vec<&'a FontRecord>,
    theme: Theme,
}

impl<'a> StyleSheet<'a> {
    fn new(palette: &'a [ColorRecord], fonts: &'a [FontRecord]) -> Self {
        Self {
            palette,
            fonts: named_fonts(fonts).into_iter().take(FONT_LIMIT).collect(),
            theme: Theme::from_records(palette),
        }
    }

    fn variables(&self) -> String {
        let mut out = String::from(":root {\n  /* Colors */\n");
        for (i, record) in self.palette.iter().take(PALETTE_LIMIT).enumerate() {
            let _ = writeln!(out, "  --color-{}: {};", i + 1, record.hex);
        }
        for (role, hex) in self.theme.roles() {
            let _ = writeln!(out, "  --color-{}: {};", role, hex);
        }
        let _ = writeln!(out, "  --color-primary-light: {};", self.theme.primary_light);
        let _ = writeln!(out, "  --color-primary-dark: {};", self.theme.primary_dark);

        if !self.fonts.is_empty() {
            out.push_str("\n  /* Typography */\n");
            for (i, font) in self.fonts.iter().enumerate() {
                let _ = writeln!(out, "  --font-{}: {};", i + 1, font.stack());
            }
            for (name, font) in SEMANTIC_FONTS.iter().zip(&self.fonts) {
                let _ = writeln!(out, "  --font-{}: {};", name, font.stack());
            }
        }

        for (title, prefix, scale) in [
            ("Spacing", "space", &SPACING_SCALE[..]),
            ("Border Radius", "radius", &RADIUS_SCALE[..]),
            ("Shadows", "shadow", &SHADOW_SCALE[..]),
        ] {
            let _ = write!(out, "\n  /* {} */\n", title);
            for (name, value) in scale {
                let _ = writeln!(out, "  --{}-{}: {};", prefix, name, value);
            }
        }
        out.push('}');
        out
    }

    fn utilities(&self) -> String {
        let mut out = String::from("/* Utility Classes */\n");
        let palette = (1..=self.palette.len().min(PALETTE_UTILITY_LIMIT))
            .map(|i| (format!("color-{}", i), format!("color-{}", i)));
        let roles = ["primary", "secondary", "accent"]
            .iter()
            .map(|r| (r.to_string(), format!("color-{}", r)));
        for (class, var) in palette.chain(roles) {
            let _ = writeln!(out, ".text-{} {{ color: var(--{}); }}", class, var);
            let _ = writeln!(out, ".bg-{} {{ background-color: var(--{}); }}", class, var);
            let _ = writeln!(out, ".border-{} {{ border-color: var(--{}); }}", class, var);
        }

        out.push_str("\n/* Typography Classes */\n");
        for i in 1..=self.fonts.len().min(4) {
            let _ = writeln!(out, ".font-{} {{ font-family: var(--font-{}); }}", i, i);
        }
        for name in SEMANTIC_FONTS.iter().take(self.fonts.len()) {
            let _ = writeln!(out, ".font-{} {{ font-family: var(--font-{}); }}", name, name);
        }
        for (name, size, line) in TYPE_SCALE {
            let _ = writeln!(
                out,
                ".text-{} {{ font-size: {}; line-height: {}; }}",
                name, size, line
            );
        }

        out.push_str("\n/* Component Classes */\n");
        out.push_str(
            ".btn {\n  display: inline-flex;\n  align-items: center;\n  justify-content: center;\n  padding: var(--space-sm) var(--space-md);\n  border: 1px solid transparent;\n  border-radius: var(--radius-md);\n  font-weight: 500;\n  cursor: pointer;\n}\n",
        );
        out.push_str(
            ".btn-primary {\n  background-color: var(--color-primary);\n  color: var(--color-background);\n}\n",
        );
        out.push_str(".btn-primary:hover {\n  background-color: var(--color-primary-dark);\n}\n");
        out.push_str(
            ".card {\n  background-color: var(--color-background);\n  color: var(--color-text);\n  border-radius: var(--radius-lg);\n  box-shadow: var(--shadow-md);\n  padding: var(--space-lg);\n}\n",
        );
        out
    }

    fn to_css(&self, url: &str) -> String {
        format!(
            "/*\n * CSS Design System\n * Generated from: {}\n */\n\n{}\n\n{}",
            url,
            self.variables(),
            self.utilities()
        )
    }

    /// Values exposed to user templates.
    fn context(&self, url: &str) -> serde_json::Value {
        json!({
            "url": url,
            "variables": self.variables(),
            "utilities": self.utilities(),
            "colors": {
                "primary": self.theme.primary,
                "secondary": self.theme.secondary,
                "accent": self.theme.accent,
                "background": self.theme.background,
                "text": self.theme.text,
                "primaryLight": self.theme.primary_light,
                "primaryDark": self.theme.primary_dark,
            },
            "palette": self.palette,
            "fonts": self.fonts.iter().map(|f| json!({
                "family": f.family,
                "stack": f.stack(),
            })).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::GeneratorSettings;
    use crate::types::DataBag;
    use tempfile::TempDir;

    fn bag() -> DataBag {
        let mut bag = DataBag::new();
        bag.insert(
            "colors",
            json!([
                {"hex": "#ff6600", "role": "primary", "count": 5},
                {"hex": "#ffffff", "role": "background", "count": 3}
            ]),
        );
        bag.insert(
            "fonts",
            json!([
                {"family": "Open Sans", "classification": "sans-serif", "fallback": "sans-serif"},
                {"family": "inherit", "classification": "css-keyword", "fallback": "inherit"}
            ]),
        );
        bag
    }

    async fn inline(generator: &CssGenerator, data: &DataBag) -> String {
        let artifacts = generator
            .generate(&GenerationInput { url: "https://acme.test", data }, None)
            .await
            .unwrap();
        artifacts[0].content().unwrap().to_string()
    }

    #[tokio::test]
    async fn emits_variables_and_utilities() {
        let css = inline(&CssGenerator::new("css", &PluginSettings::default()), &bag()).await;
        assert!(css.contains("Generated from: https://acme.test"));
        assert!(css.contains("  --color-1: #ff6600;"));
        assert!(css.contains("  --color-primary: #ff6600;"));
        assert!(css.contains("  --color-background: #ffffff;"));
        // no secondary in the data, so the default fills in
        assert!(css.contains("  --color-secondary: #64748b;"));
        assert!(css.contains("--color-primary-dark: #"));
        assert!(css.contains("  --font-1: 'Open Sans', sans-serif;"));
        assert!(css.contains("  --font-primary: 'Open Sans', sans-serif;"));
        assert!(!css.contains("--font-2"));
        assert!(css.contains(".text-color-1 { color: var(--color-1); }"));
        assert!(css.contains(".bg-primary { background-color: var(--color-primary); }"));
        assert!(css.contains("  --space-md: 1rem;"));
        assert!(css.contains(".btn-primary"));
    }

    #[tokio::test]
    async fn missing_data_uses_defaults() {
        let css = inline(&CssGenerator::new("css", &PluginSettings::default()), &DataBag::new()).await;
        assert!(css.contains("  --color-primary: #3b82f6;"));
        assert!(!css.contains("--color-1:"));
        assert!(!css.contains("/* Typography */"));
    }

    #[tokio::test]
    async fn renders_configured_template() {
        let dir = TempDir::new().expect("tempdir");
        let template = dir.path().join("theme.css.tmpl");
        std::fs::write(&template, "/* {{ url }} */\n.brand { color: {{ colors.primary }}; font-family: {{ fonts.0.stack }}; }").unwrap();
        let mut settings = PluginSettings::default();
        settings.generators.insert(
            "css".into(),
            GeneratorSettings {
                template: Some(template),
                subdir: Some("theme".into()),
            },
        );
        let dest = OutputDestination::new(dir.path());
        let data = bag();
        let artifacts = CssGenerator::new("css", &settings)
            .generate(&GenerationInput { url: "https://acme.test", data: &data }, Some(&dest))
            .await
            .unwrap();
        let written = std::fs::read_to_string(dir.path().join("theme").join(FILE_NAME)).unwrap();
        assert_eq!(
            written,
            "/* https://acme.test */\n.brand { color: #ff6600; font-family: 'Open Sans', sans-serif; }"
        );
        assert!(artifacts[0].content().is_none());
    }

    #[tokio::test]
    async fn unreadable_template_is_a_generation_error() {
        let mut settings = PluginSettings::default();
        settings.generators.insert(
            "css".into(),
            GeneratorSettings {
                template: Some("/nonexistent/dsx/theme.tmpl".into()),
                subdir: None,
            },
        );
        let data = DataBag::new();
        let err = CssGenerator::new("css", &settings)
            .generate(&GenerationInput { url: "https://acme.test", data: &data }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DsxError::Generation { ref plugin, .. } if plugin == "css"));
    }
}
