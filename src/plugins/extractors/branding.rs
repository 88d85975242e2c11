use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::{absolute_url, parse_declarations};
use crate::analysis::color::parse_color;
use crate::analysis::{LogoCandidate, LogoScorer};
use crate::page::{Document, StyleQuery};
use crate::plugins::{Capability, Extractor, PluginSettings};
use crate::types::DomNode;
use crate::{DsxError, Result};

const MAX_BRAND_COLORS: usize = 5;
const FAVICON_RELS: [&str; 4] = ["icon", "shortcut icon", "apple-touch-icon", "favicon"];
const ORGANIZATION_META: [&str; 4] = [
    "og:site_name",
    "application-name",
    "apple-mobile-web-app-title",
    "og:title",
];
const TITLE_SUFFIXES: [&str; 4] = [" - Home", " | Home", " - Official Site", " | Official Site"];
const BRAND_PROPERTY_TERMS: [&str; 4] = ["color", "brand", "primary", "theme"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Set when the only logo found is an inline `<svg>`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inline_svg_logo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default)]
    pub brand_colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(default)]
    pub apple_touch_icons: Vec<TouchIcon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchIcon {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
}

/// Logo, icons, organization name and brand colors.
pub struct BrandingExtractor {
    id: String,
    scorer: LogoScorer,
}

impl BrandingExtractor {
    pub fn new(id: &str, settings: &PluginSettings) -> Self {
        Self {
            id: id.to_string(),
            scorer: LogoScorer::new(settings.logo_weights.clone()),
        }
    }

    pub fn analyze(&self, document: &Document, url: &Url) -> BrandingRecord {
        let base = document
            .url()
            .and_then(|u| Url::parse(u).ok())
            .unwrap_or_else(|| url.clone());
        let theme_color = theme_color(document);
        let logo_url = self.logo(document, &base);
        BrandingRecord {
            inline_svg_logo: logo_url.is_none() && has_svg_logo(document),
            logo_url,
            favicon_url: favicon(document, &base),
            organization: organization(document),
            brand_colors: brand_colors(document, theme_color.as_deref()),
            theme_color,
            apple_touch_icons: touch_icons(document, &base),
        }
    }

    fn logo(&self, document: &Document, base: &Url) -> Option<String> {
        let candidates: Vec<LogoCandidate> = document
            .by_tag("img")
            .filter_map(|img| {
                let src = img
                    .attr("src")
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| img.attr("data-src"))?;
                // inline and script sources cannot be downloaded as a logo
                absolute_url(base, src)?;
                Some(LogoCandidate {
                    classes: img.classes().map(str::to_string).collect(),
                    id: img.attr("id").map(str::to_string),
                    alt: img.attr("alt").map(str::to_string),
                    src: src.trim().to_string(),
                })
            })
            .collect();
        let best = self.scorer.select(&candidates)?;
        debug!(
            src = %best.candidate.src,
            score = best.score,
            candidates = candidates.len(),
            "selected logo candidate"
        );
        absolute_url(base, &best.candidate.src)
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Extractor(Arc::new(BrandingExtractor::new(
        id, settings,
    ))))
}

impl Extractor for BrandingExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Logo, favicon, touch icons, organization name and brand colors"
    }

    fn extract(
        &self,
        document: &Document,
        _styles: &dyn StyleQuery,
        url: &Url,
    ) -> Result<serde_json::Value> {
        serde_json::to_value(self.analyze(document, url))
            .map_err(|e| DsxError::extraction(&self.id, e.to_string()))
    }
}

fn has_svg_logo(document: &Document) -> bool {
    document
        .by_tag("svg")
        .any(|svg| svg.classes().any(|c| c.to_ascii_lowercase().contains("logo")))
}

fn favicon(document: &Document, base: &Url) -> Option<String> {
    FAVICON_RELS
        .iter()
        .find_map(|rel| {
            document
                .links_with_rel(rel)
                .find_map(|link| link.attr("href").and_then(|href| absolute_url(base, href)))
        })
        .or_else(|| absolute_url(base, "/favicon.ico"))
}

fn organization(document: &Document) -> Option<String> {
    ORGANIZATION_META
        .iter()
        .find_map(|key| document.meta_content(key))
        .map(str::to_string)
        .or_else(|| {
            let title = document.title()?;
            let trimmed = TITLE_SUFFIXES
                .iter()
                .find_map(|suffix| title.strip_suffix(suffix))
                .unwrap_or(&title)
                .trim()
                .to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        })
}

fn theme_color(document: &Document) -> Option<String> {
    document
        .meta_content("theme-color")
        .or_else(|| document.meta_content("msapplication-TileColor"))
        .map(str::to_string)
}

/// Theme color plus brand-ish custom properties, as unique hex values.
fn brand_colors(document: &Document, theme: Option<&str>) -> Vec<String> {
    let custom = document
        .style_blocks()
        .flat_map(parse_declarations)
        .filter(|d| {
            d.property.starts_with("--")
                && BRAND_PROPERTY_TERMS.iter().any(|t| d.property.contains(t))
        })
        .map(|d| d.value);

    let mut out: Vec<String> = Vec::new();
    for value in theme.map(str::to_string).into_iter().chain(custom) {
        let Some(color) = parse_color(&value).filter(|c| !c.is_transparent()) else {
            continue;
        };
        let hex = color.hex();
        if !out.contains(&hex) {
            out.push(hex);
        }
        if out.len() == MAX_BRAND_COLORS {
            break;
        }
    }
    out
}

fn is_touch_icon(link: &DomNode) -> bool {
    link.attr("rel")
        .map(|rel| rel.to_ascii_lowercase().contains("apple-touch-icon"))
        .unwrap_or(false)
}

fn touch_icons(document: &Document, base: &Url) -> Vec<TouchIcon> {
    document
        .by_tag("link")
        .filter(|link| is_touch_icon(link))
        .filter_map(|link| {
            Some(TouchIcon {
                url: absolute_url(base, link.attr("href")?)?,
                sizes: link
                    .attr("sizes")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}
