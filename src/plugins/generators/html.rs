use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use super::{branding, colors, fonts, named_fonts, OutputTarget, Theme};
use crate::analysis::color::contrast_text;
use crate::analysis::{ColorRecord, FontRecord};
use crate::plugins::extractors::branding::BrandingRecord;
use crate::plugins::{Capability, GenerationInput, Generator, OutputDestination, PluginSettings};
use crate::types::Artifact;
use crate::Result;

pub const FILE_NAME: &str = "styles.html";

const SWATCH_LIMIT: usize = 12;
const FONT_LIMIT: usize = 8;
const PANGRAM: &str = "The quick brown fox jumps over the lazy dog";

const PAGE_STYLE: &str = r#"* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: system-ui, -apple-system, sans-serif; line-height: 1.6; color: #333; max-width: 1200px; margin: 0 auto; padding: 2rem; background: #f8fafc; }
.header, .section { background: white; border-radius: 12px; box-shadow: 0 2px 20px rgba(0, 0, 0, 0.1); padding: 2rem; margin-bottom: 2rem; }
.header { text-align: center; }
.header h1 { color: #1e293b; font-size: 2.5rem; margin-bottom: 0.5rem; }
.header p { color: #64748b; }
.header img { max-height: 64px; margin-bottom: 1rem; }
.section h2 { color: #1e293b; font-size: 1.8rem; margin-bottom: 1.5rem; padding-bottom: 0.5rem; border-bottom: 3px solid #3b82f6; }
.info-grid, .color-grid { display: grid; gap: 1rem; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); }
.info-item { padding: 1rem; border: 1px solid #e2e8f0; border-radius: 8px; background: #f8fafc; }
.info-label { font-weight: 600; color: #475569; margin-bottom: 0.5rem; }
.info-value, .color-value, .font-name { font-family: 'SF Mono', Monaco, monospace; color: #475569; word-break: break-all; }
.color-swatch { border: 1px solid #e2e8f0; border-radius: 8px; overflow: hidden; cursor: pointer; transition: transform 0.2s; }
.color-swatch:hover, .font-sample:hover { transform: translateY(-2px); box-shadow: 0 4px 12px rgba(0, 0, 0, 0.15); }
.color-preview { height: 80px; display: flex; align-items: center; justify-content: center; font-weight: 500; }
.color-info { padding: 1rem; text-align: center; }
.font-grid { display: grid; gap: 1.5rem; }
.font-sample { border: 1px solid #e2e8f0; border-radius: 8px; padding: 1.5rem; }
.font-preview { font-size: 1.25rem; color: #1e293b; margin: 0.5rem 0; }
.font-size { color: #64748b; }
pre { background: #1e293b; color: #e2e8f0; padding: 1rem; border-radius: 8px; overflow-x: auto; }
.copied { outline: 3px solid #10b981; }
@media (max-width: 768px) { body { padding: 1rem; } .header h1 { font-size: 2rem; } }
@media print { body { background: white; max-width: none; } .section { box-shadow: none; border: 1px solid #e2e8f0; break-inside: avoid; } }
"#;

const COPY_SCRIPT: &str = r#"document.querySelectorAll('.color-swatch').forEach(function (swatch) {
  swatch.addEventListener('click', function () {
    var value = swatch.dataset.color;
    if (navigator.clipboard) {
      navigator.clipboard.writeText(value).then(function () {
        swatch.classList.add('copied');
        setTimeout(function () { swatch.classList.remove('copied'); }, 1000);
      });
    }
  });
});
"#;

/// A standalone style guide page with swatches and font specimens.
pub struct HtmlGenerator {
    id: String,
    target: OutputTarget,
}

impl HtmlGenerator {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        Self {
            id: id.to_string(),
            target: OutputTarget::new(id, settings),
        }
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Generator(Arc::new(HtmlGenerator::new(id, settings))))
}

#[async_trait]
impl Generator for HtmlGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "HTML style guide with color swatches and font specimens"
    }

    fn format(&self) -> &str {
        "html"
    }

    async fn generate(
        &self,
        input: &GenerationInput<'_>,
        output: Option<&OutputDestination>,
    ) -> Result<Vec<Artifact>> {
        let palette = colors(input.data);
        let fonts = fonts(input.data);
        let content = style_guide(input.url, &palette, &fonts, branding(input.data).as_ref());
        let artifact = self.target.emit(output, FILE_NAME, "text/html", content).await?;
        Ok(vec![artifact])
    }
}

/// Escapes text for element content and quoted attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn info_item(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        out,
        "      <div class=\"info-item\"><div class=\"info-label\">{}</div><div class=\"info-value\">{}</div></div>",
        label,
        escape_html(value)
    );
}

pub(crate) fn style_guide(
    url: &str,
    palette: &[ColorRecord],
    fonts: &[FontRecord],
    branding: Option<&BrandingRecord>,
) -> String {
    let theme = Theme::from_records(palette);
    let named = named_fonts(fonts);
    let body_font = named
        .first()
        .map(|f| f.stack())
        .unwrap_or_else(|| "system-ui, sans-serif".to_string());
    let site = branding
        .and_then(|b| b.organization.as_deref())
        .unwrap_or(url);

    let mut out = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("  <meta charset=\"UTF-8\">\n");
    out.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    let _ = writeln!(out, "  <title>Style Guide - {}</title>", escape_html(site));
    let _ = write!(out, "  <style>\n{}  </style>\n</head>\n<body>\n", PAGE_STYLE);

    out.push_str("  <div class=\"header\">\n");
    if let Some(logo) = branding.and_then(|b| b.logo_url.as_deref()) {
        let _ = writeln!(
            out,
            "    <img src=\"{}\" alt=\"{} logo\">",
            escape_html(logo),
            escape_html(site)
        );
    }
    out.push_str("    <h1>Style Guide</h1>\n");
    let _ = writeln!(
        out,
        "    <p>Extracted from <a href=\"{0}\">{0}</a></p>\n  </div>",
        escape_html(url)
    );

    out.push_str("  <div class=\"section\">\n    <h2>Basic Information</h2>\n    <div class=\"info-grid\">\n");
    info_item(&mut out, "URL", url);
    info_item(&mut out, "Body Background", &theme.background);
    info_item(&mut out, "Body Font", &body_font);
    if let Some(org) = branding.and_then(|b| b.organization.as_deref()) {
        info_item(&mut out, "Organization", org);
    }
    out.push_str("    </div>\n  </div>\n");

    out.push_str("  <div class=\"section\">\n    <h2>Color Palette</h2>\n");
    if palette.is_empty() {
        out.push_str("    <p>No colors were extracted.</p>\n");
    } else {
        out.push_str("    <div class=\"color-grid\">\n");
        for (i, record) in palette.iter().take(SWATCH_LIMIT).enumerate() {
            let hex = escape_html(&record.hex);
            let label = match record.role {
                Some(role) => format!("{} ({})", i + 1, role.as_str()),
                None => (i + 1).to_string(),
            };
            let _ = writeln!(
                out,
                "      <div class=\"color-swatch\" data-color=\"{hex}\" title=\"Click to copy\">\n        <div class=\"color-preview\" style=\"background-color: {hex}; color: {};\">Color {}</div>\n        <div class=\"color-info\"><div class=\"color-value\">{hex}</div><div>used {} times</div></div>\n      </div>",
                contrast_text(&record.hex),
                label,
                record.count,
            );
        }
        out.push_str("    </div>\n");
    }
    out.push_str("  </div>\n");

    out.push_str("  <div class=\"section\">\n    <h2>Typography</h2>\n");
    if named.is_empty() {
        out.push_str("    <p>No named font families were extracted.</p>\n");
    } else {
        out.push_str("    <div class=\"font-grid\">\n");
        for font in named.iter().take(FONT_LIMIT) {
            let stack = escape_html(&font.stack());
            let _ = writeln!(
                out,
                "      <div class=\"font-sample\">\n        <div class=\"font-name\">{} ({})</div>\n        <div class=\"font-preview\" style=\"font-family: {stack};\">{PANGRAM}</div>\n        <div class=\"font-size\" style=\"font-family: {stack}; font-size: 0.875rem;\">Small text sample</div>\n        <div class=\"font-size\" style=\"font-family: {stack}; font-size: 1.5rem;\">Large text sample</div>\n      </div>",
                escape_html(&font.family),
                font.classification.as_str(),
            );
        }
        out.push_str("    </div>\n");
    }
    out.push_str("  </div>\n");

    out.push_str("  <div class=\"section\">\n    <h2>Usage</h2>\n");
    out.push_str("    <p>Click a swatch to copy its value. The generated stylesheets expose the palette as custom properties:</p>\n");
    let _ = writeln!(
        out,
        "    <pre>.button {{\n  background-color: var(--color-primary); /* {} */\n  color: var(--color-background); /* {} */\n  font-family: var(--font-primary);\n}}</pre>\n  </div>",
        escape_html(&theme.primary),
        escape_html(&theme.background)
    );

    let _ = write!(out, "  <script>\n{}  </script>\n</body>\n</html>\n", COPY_SCRIPT);
    out
}
