//! Color parsing, deduplication and palette role assignment.

use palette::{convert::FromColorUnclamped, Darken, FromColor, Hsl, Lab, Lch, Lighten, Oklch, Srgb};
use serde::{Deserialize, Serialize};

/// Default cap on normalized output length.
pub const DEFAULT_MAX_COLORS: usize = 10;

/// An 8-bit-per-channel color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Canonical identity key: lowercase `#rrggbb`, alpha discarded.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    fn to_srgb(self) -> Srgb {
        Srgb::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    fn from_srgb(srgb: Srgb, a: u8) -> Self {
        let c: Srgb<u8> = srgb.into_format();
        Self {
            r: c.red,
            g: c.green,
            b: c.blue,
            a,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorRole {
    Primary,
    Secondary,
    Accent,
    Background,
    Text,
}

impl ColorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorRole::Primary => "primary",
            ColorRole::Secondary => "secondary",
            ColorRole::Accent => "accent",
            ColorRole::Background => "background",
            ColorRole::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRecord {
    pub hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ColorRole>,
    pub count: usize,
}

/// Collapses raw color expressions into unique records ordered by frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorNormalizer {
    pub max_colors: usize,
}

impl Default for ColorNormalizer {
    fn default() -> Self {
        Self {
            max_colors: DEFAULT_MAX_COLORS,
        }
    }
}

impl ColorNormalizer {
    pub fn new(max_colors: usize) -> Self {
        Self { max_colors }
    }

    /// Unique colors by descending count, capped at `max_colors`.
    pub fn normalize<I, S>(&self, raw: I) -> Vec<ColorRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records = self.normalize_uncapped(raw);
        records.truncate(self.max_colors);
        records
    }

    /// Every unique parseable color; ties keep first-seen order.
    pub fn normalize_uncapped<I, S>(&self, raw: I) -> Vec<ColorRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records: Vec<ColorRecord> = Vec::new();
        for value in raw {
            let Some(color) = parse_color(value.as_ref()) else {
                continue;
            };
            let hex = color.hex();
            match records.iter_mut().find(|r| r.hex == hex) {
                Some(existing) => existing.count += 1,
                None => records.push(ColorRecord {
                    hex,
                    role: None,
                    count: 1,
                }),
            }
        }
        // Stable sort keeps first-seen order among equal counts.
        records.sort_by(|a, b| b.count.cmp(&a.count));
        records
    }
}

/// Parses a CSS color expression. Returns `None` for anything not a concrete color.
pub fn parse_color(raw: &str) -> Option<Rgba> {
    let value = raw.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }
    if value == "transparent" {
        return Some(Rgba { r: 0, g: 0, b: 0, a: 0 });
    }
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = function_args(&value, &["rgba", "rgb"]) {
        return parse_rgb_args(args);
    }
    if let Some(args) = function_args(&value, &["hsla", "hsl"]) {
        return parse_hsl_args(args);
    }
    palette::named::from_str(&value).map(|c| Rgba::opaque(c.red, c.green, c.blue))
}

fn function_args<'a>(value: &'a str, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        value
            .strip_prefix(name)
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
    })
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::opaque(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba {
            r: nibble(0)?,
            g: nibble(1)?,
            b: nibble(2)?,
            a: nibble(3)?,
        }),
        6 => Some(Rgba::opaque(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: byte(6)?,
        }),
        _ => None,
    }
}

/// Splits `a, b, c / d` or `a b c / d` into channel tokens and optional alpha.
fn split_channels(args: &str) -> Option<(Vec<&str>, Option<&str>)> {
    let (channels, slash_alpha) = match args.split_once('/') {
        Some((c, a)) => (c, Some(a.trim())),
        None => (args, None),
    };
    let mut parts: Vec<&str> = if channels.contains(',') {
        channels.split(',').map(str::trim).collect()
    } else {
        channels.split_whitespace().collect()
    };
    let alpha = match (slash_alpha, parts.len()) {
        (Some(a), 3) => Some(a),
        (None, 4) => parts.pop(),
        (None, 3) => None,
        _ => return None,
    };
    Some((parts, alpha))
}

fn parse_alpha(token: Option<&str>) -> Option<u8> {
    let Some(token) = token else {
        return Some(255);
    };
    let value = match token.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => token.trim().parse::<f32>().ok()?,
    };
    Some((value.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let (parts, alpha) = split_channels(args)?;
    let channel = |token: &str| -> Option<u8> {
        let value = match token.strip_suffix('%') {
            Some(pct) => pct.trim().parse::<f32>().ok()? * 2.55,
            None => token.parse::<f32>().ok()?,
        };
        Some(value.clamp(0.0, 255.0).round() as u8)
    };
    Some(Rgba {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        a: parse_alpha(alpha)?,
    })
}

fn parse_hsl_args(args: &str) -> Option<Rgba> {
    let (parts, alpha) = split_channels(args)?;
    let hue: f32 = parts[0].trim_end_matches("deg").parse().ok()?;
    let percent = |token: &str| -> Option<f32> {
        let v: f32 = token.trim_end_matches('%').parse().ok()?;
        Some((v / 100.0).clamp(0.0, 1.0))
    };
    let hsl: Hsl = Hsl::new(hue, percent(parts[1])?, percent(parts[2])?);
    Some(Rgba::from_srgb(Srgb::from_color(hsl), parse_alpha(alpha)?))
}

/// Perceptual lightness check (CIE L* above the midpoint).
pub fn is_light(hex: &str) -> bool {
    parse_color(hex)
        .map(|c| {
            let lab: Lab = Lab::from_color_unclamped(c.to_srgb());
            lab.l > 50.0
        })
        .unwrap_or(false)
}

/// Low-chroma colors (greys, black, white) carry no brand signal.
pub fn is_neutral(hex: &str) -> bool {
    parse_color(hex)
        .map(|c| {
            let lch: Lch = Lch::from_color_unclamped(c.to_srgb());
            lch.chroma < 10.0
        })
        .unwrap_or(true)
}

/// Black or white, whichever reads better on `hex` by YIQ brightness.
pub fn contrast_text(hex: &str) -> &'static str {
    match parse_color(hex) {
        Some(c) if (c.r as u32 * 299 + c.g as u32 * 587 + c.b as u32 * 114) / 1000 <= 128 => {
            "#ffffff"
        }
        _ => "#000000",
    }
}

/// `oklch(L C H)` notation, lightness as a percentage and hue in degrees.
pub fn to_oklch(hex: &str) -> Option<String> {
    let c = parse_color(hex)?;
    let oklch: Oklch = Oklch::from_color_unclamped(c.to_srgb());
    let hue = if oklch.chroma < 1e-4 {
        0.0
    } else {
        oklch.hue.into_positive_degrees()
    };
    Some(format!(
        "oklch({:.1}% {:.3} {:.1})",
        oklch.l * 100.0,
        oklch.chroma,
        hue
    ))
}

pub fn lighten(hex: &str, amount: f32) -> Option<String> {
    let c = parse_color(hex)?;
    let hsl: Hsl = Hsl::from_color(c.to_srgb());
    Some(Rgba::from_srgb(Srgb::from_color(hsl.lighten(amount)), 255).hex())
}

pub fn darken(hex: &str, amount: f32) -> Option<String> {
    let c = parse_color(hex)?;
    let hsl: Hsl = Hsl::from_color(c.to_srgb());
    Some(Rgba::from_srgb(Srgb::from_color(hsl.darken(amount)), 255).hex())
}

/// Assigns palette roles in place.
///
/// Background is the most frequent light color and text the most frequent
/// dark one. Primary, secondary and accent go to the most frequent
/// remaining colors, preferring chromatic ones.
pub fn assign_roles(records: &mut [ColorRecord]) {
    for record in records.iter_mut() {
        record.role = None;
    }
    if let Some(bg) = records.iter_mut().find(|r| is_light(&r.hex)) {
        bg.role = Some(ColorRole::Background);
    }
    if let Some(text) = records
        .iter_mut()
        .find(|r| r.role.is_none() && !is_light(&r.hex))
    {
        text.role = Some(ColorRole::Text);
    }

    let mut brand: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.role.is_none() && !is_neutral(&r.hex))
        .map(|(i, _)| i)
        .collect();
    brand.extend(
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.role.is_none() && is_neutral(&r.hex))
            .map(|(i, _)| i),
    );
    for (idx, role) in brand
        .into_iter()
        .zip([ColorRole::Primary, ColorRole::Secondary, ColorRole::Accent])
    {
        records[idx].role = Some(role);
    }
}

/// Hex of the record holding `role`, if any.
pub fn role_hex(records: &[ColorRecord], role: ColorRole) -> Option<&str> {
    records
        .iter()
        .find(|r| r.role == Some(role))
        .map(|r| r.hex.as_str())
}
