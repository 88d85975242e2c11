use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::{Arc, OnceLock};

use super::{colors, fonts, named_fonts, OutputTarget, Theme};
use crate::analysis::{ColorRecord, FontClass, FontRecord};
use crate::plugins::{Capability, GenerationInput, Generator, OutputDestination, PluginSettings};
use crate::types::Artifact;
use crate::{DsxError, Result};

pub const FILE_NAME: &str = "tailwind.config.js";

const PALETTE_LIMIT: usize = 10;
const FONT_ROLES: [&str; 3] = ["primary", "secondary", "display"];

/// `tailwind.config.js` extending the theme with page colors and fonts.
pub struct TailwindGenerator {
    id: String,
    target: OutputTarget,
}

impl TailwindGenerator {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        Self {
            id: id.to_string(),
            target: OutputTarget::new(id, settings),
        }
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Generator(Arc::new(TailwindGenerator::new(
        id, settings,
    ))))
}

#[async_trait]
impl Generator for TailwindGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Tailwind CSS configuration with extracted colors and fonts"
    }

    fn format(&self) -> &str {
        "tailwind"
    }

    async fn generate(
        &self,
        input: &GenerationInput<'_>,
        output: Option<&OutputDestination>,
    ) -> Result<Vec<Artifact>> {
        let config = build_config(&colors(input.data), &fonts(input.data));
        let content = to_js_module(&config, input.url)
            .map_err(|e| DsxError::generation(&self.id, e.to_string()))?;
        let artifact = self
            .target
            .emit(output, FILE_NAME, "text/javascript", content)
            .await?;
        Ok(vec![artifact])
    }
}

pub(crate) fn build_config(palette: &[ColorRecord], fonts: &[FontRecord]) -> Value {
    let theme = Theme::from_records(palette);
    let mut colors = Map::new();
    for (role, hex) in theme.roles() {
        colors.insert(role.to_string(), json!(hex));
    }
    let extracted: Map<String, Value> = palette
        .iter()
        .take(PALETTE_LIMIT)
        .enumerate()
        .map(|(i, r)| ((i + 1).to_string(), json!(r.hex)))
        .collect();
    if !extracted.is_empty() {
        colors.insert("extracted".into(), Value::Object(extracted));
    }

    let named = named_fonts(fonts);
    let font_family: Map<String, Value> = FONT_ROLES
        .iter()
        .enumerate()
        .filter_map(|(i, role)| {
            let font = named.get(i)?;
            let generic = match font.classification {
                FontClass::Serif => "serif",
                FontClass::Monospace => "monospace",
                _ => "sans-serif",
            };
            Some((role.to_string(), json!([font.family, "system-ui", generic])))
        })
        .collect();

    json!({
        "content": [
            "./src/**/*.{js,jsx,ts,tsx}",
            "./pages/**/*.{js,jsx,ts,tsx}",
            "./components/**/*.{js,jsx,ts,tsx}",
            "./public/**/*.html"
        ],
        "theme": {
            "extend": {
                "colors": colors,
                "fontFamily": font_family,
                "borderRadius": { "4xl": "2rem", "5xl": "2.5rem" },
                "boxShadow": {
                    "soft": "0 2px 15px -3px rgba(0, 0, 0, 0.07), 0 10px 20px -2px rgba(0, 0, 0, 0.04)",
                    "brand": format!("0 4px 14px 0 {}40", theme.primary),
                },
            }
        },
        "plugins": []
    })
}

fn js_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^(\s*)"([A-Za-z_$][A-Za-z0-9_$]*)":"#).expect("valid js key regex")
    })
}

/// Pretty JSON with identifier keys unquoted, wrapped as a CommonJS module.
pub(crate) fn to_js_module(config: &Value, url: &str) -> serde_json::Result<String> {
    let pretty = serde_json::to_string_pretty(config)?;
    let body = js_key_re().replace_all(&pretty, "$1$2:");
    Ok(format!(
        "// Generated from {}\n/** @type {{import('tailwindcss').Config}} */\nmodule.exports = {};\n",
        url, body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ColorRole;
    use crate::types::DataBag;

    #[test]
    fn config_extends_theme_from_bag_data() {
        let palette = vec![
            ColorRecord {
                hex: "#ff6600".into(),
                role: Some(ColorRole::Primary),
                count: 4,
            },
            ColorRecord {
                hex: "#ffffff".into(),
                role: Some(ColorRole::Background),
                count: 2,
            },
        ];
        let fonts = vec![FontRecord::new("Merriweather"), FontRecord::new("serif")];
        let config = build_config(&palette, &fonts);
        let extend = &config["theme"]["extend"];
        assert_eq!(extend["colors"]["primary"], "#ff6600");
        assert_eq!(extend["colors"]["secondary"], "#64748b");
        assert_eq!(extend["colors"]["extracted"]["2"], "#ffffff");
        assert_eq!(
            extend["fontFamily"]["primary"],
            json!(["Merriweather", "system-ui", "serif"])
        );
        assert!(extend["fontFamily"].get("secondary").is_none());
        assert_eq!(extend["boxShadow"]["brand"], "0 4px 14px 0 #ff660040");
    }

    #[test]
    fn module_unquotes_identifier_keys_only() {
        let js = to_js_module(&build_config(&[], &[]), "https://acme.test").unwrap();
        assert!(js.starts_with("// Generated from https://acme.test\n"));
        assert!(js.contains("module.exports = {"));
        assert!(js.contains("  theme: {"));
        assert!(js.contains("fontFamily: {}"));
        assert!(js.contains("\"4xl\": \"2rem\""));
        assert!(js.trim_end().ends_with("};"));
    }

    #[tokio::test]
    async fn generates_inline_module() {
        let data = DataBag::new();
        let artifacts = TailwindGenerator::new("tailwind", &PluginSettings::default())
            .generate(&GenerationInput { url: "https://acme.test", data: &data }, None)
            .await
            .unwrap();
        assert_eq!(artifacts[0].media_type, "text/javascript");
        assert!(artifacts[0].content().unwrap().contains("primary: \"#3b82f6\""));
    }
}
