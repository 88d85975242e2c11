//! Font-family classification.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontClass {
    Serif,
    SansSerif,
    Monospace,
    Display,
    CssKeyword,
    Custom,
}

impl FontClass {
    pub fn as_str(self) -> &'static str {
        match self {
            FontClass::Serif => "serif",
            FontClass::SansSerif => "sans-serif",
            FontClass::Monospace => "monospace",
            FontClass::Display => "display",
            FontClass::CssKeyword => "css-keyword",
            FontClass::Custom => "custom",
        }
    }

    /// Suggested fallback stack for a family of this class.
    pub fn fallback(self) -> &'static str {
        match self {
            FontClass::Serif => "Georgia, 'Times New Roman', serif",
            FontClass::SansSerif => "system-ui, -apple-system, 'Segoe UI', sans-serif",
            FontClass::Monospace => "SFMono-Regular, Menlo, Consolas, 'Courier New', monospace",
            FontClass::Display => "system-ui, sans-serif",
            FontClass::CssKeyword => "",
            FontClass::Custom => "sans-serif",
        }
    }
}

impl fmt::Display for FontClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontRecord {
    pub family: String,
    pub classification: FontClass,
    pub fallback: String,
}

impl FontRecord {
    pub fn new(family: &str) -> Self {
        let classification = classify(family);
        let fallback = match classification {
            FontClass::CssKeyword => unquote(family).to_ascii_lowercase(),
            other => other.fallback().to_string(),
        };
        Self {
            family: family.to_string(),
            classification,
            fallback,
        }
    }

    /// `family` followed by its fallback, ready for a `font-family` declaration.
    pub fn stack(&self) -> String {
        let name = unquote(&self.family);
        let quoted = if name.contains(' ') && !name.contains('\'') {
            format!("'{}'", name)
        } else {
            name.to_string()
        };
        match self.classification {
            FontClass::CssKeyword => self.fallback.clone(),
            _ if self.fallback.is_empty() => quoted,
            _ => format!("{}, {}", quoted, self.fallback),
        }
    }
}

const CSS_KEYWORDS: &[&str] = &["inherit", "initial", "unset", "revert", "revert-layer"];

const SERIF: &[&str] = &[
    "serif",
    "ui-serif",
    "times",
    "times new roman",
    "georgia",
    "garamond",
    "palatino",
    "palatino linotype",
    "book antiqua",
    "baskerville",
    "cambria",
    "merriweather",
    "lora",
    "pt serif",
    "noto serif",
    "source serif pro",
    "libre baskerville",
    "playfair display",
];

const SANS_SERIF: &[&str] = &[
    "sans-serif",
    "ui-sans-serif",
    "system-ui",
    "-apple-system",
    "blinkmacsystemfont",
    "arial",
    "helvetica",
    "helvetica neue",
    "verdana",
    "tahoma",
    "trebuchet ms",
    "segoe ui",
    "calibri",
    "gill sans",
    "roboto",
    "open sans",
    "lato",
    "inter",
    "montserrat",
    "noto sans",
    "source sans pro",
    "ubuntu",
    "cantarell",
    "fira sans",
    "poppins",
    "nunito",
    "raleway",
    "work sans",
];

const MONOSPACE: &[&str] = &[
    "monospace",
    "ui-monospace",
    "courier",
    "courier new",
    "consolas",
    "menlo",
    "monaco",
    "lucida console",
    "sfmono-regular",
    "sf mono",
    "fira code",
    "fira mono",
    "source code pro",
    "jetbrains mono",
    "roboto mono",
    "ubuntu mono",
    "dejavu sans mono",
    "liberation mono",
];

const DISPLAY: &[&str] = &[
    "cursive",
    "fantasy",
    "impact",
    "comic sans ms",
    "papyrus",
    "brush script mt",
    "lobster",
    "pacifico",
    "bebas neue",
    "oswald",
    "anton",
    "abril fatface",
];

/// Classifies a single font-family token. Never fails.
pub fn classify(token: &str) -> FontClass {
    let name = unquote(token).to_ascii_lowercase();
    let name = name.as_str();
    if CSS_KEYWORDS.contains(&name) {
        FontClass::CssKeyword
    } else if MONOSPACE.contains(&name) {
        FontClass::Monospace
    } else if SERIF.contains(&name) {
        FontClass::Serif
    } else if SANS_SERIF.contains(&name) {
        FontClass::SansSerif
    } else if DISPLAY.contains(&name) {
        FontClass::Display
    } else {
        FontClass::Custom
    }
}

/// Trims whitespace and one pair of matching surrounding quotes.
pub fn unquote(token: &str) -> &str {
    let t = token.trim();
    for q in ['"', '\''] {
        if t.len() >= 2 && t.starts_with(q) && t.ends_with(q) {
            return t[1..t.len() - 1].trim();
        }
    }
    t
}

/// Splits a `font-family` value into unquoted tokens, respecting quoted commas.
pub fn split_family_list(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in value.chars() {
        match (quote, ch) {
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(ch);
            }
            (None, ',') => {
                push_token(&mut out, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_token(&mut out, &current);
    out
}

fn push_token(out: &mut Vec<String>, raw: &str) {
    let token = unquote(raw);
    if !token.is_empty() {
        out.push(token.to_string());
    }
}
