//! Template rendering for generator output.
//!
//! Generators build a JSON context and hand it to a [`TemplateRenderer`]
//! together with the template text. The built-in [`PlaceholderRenderer`]
//! replaces `{{ dotted.path }}` markers with values looked up in the context.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

use crate::{DsxError, Result};

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String>;
}

/// Substitutes `{{ path.to.value }}` placeholders.
///
/// Strings render verbatim, other values as compact JSON, and missing paths
/// as the empty string. Array elements are addressed by index (`colors.0.hex`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("valid placeholder regex"))
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        let mut invalid = None;
        let rendered = placeholder_re().replace_all(template, |caps: &Captures| {
            let path = &caps[1];
            if path.is_empty() || path.split('.').any(str::is_empty) {
                invalid.get_or_insert_with(|| path.to_string());
                return String::new();
            }
            match lookup(context, path) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        });
        match invalid {
            Some(path) => Err(DsxError::Template(format!(
                "invalid placeholder path '{}'",
                path
            ))),
            None => Ok(rendered.into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_nested_paths() {
        let ctx = json!({
            "url": "https://acme.test",
            "colors": {"primary": "#3b82f6"},
            "palette": [{"hex": "#111111"}],
            "count": 3
        });
        let out = PlaceholderRenderer
            .render(
                "/* {{url}} */ a { color: {{ colors.primary }}; } b { color: {{palette.0.hex}} } /* {{ count }} */",
                &ctx,
            )
            .unwrap();
        assert_eq!(
            out,
            "/* https://acme.test */ a { color: #3b82f6; } b { color: #111111 } /* 3 */"
        );
    }

    #[test]
    fn missing_paths_render_empty() {
        let out = PlaceholderRenderer
            .render("[{{ nope.nothing }}]", &json!({}))
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn rejects_malformed_placeholders() {
        let err = PlaceholderRenderer
            .render("{{ colors..primary }}", &json!({}))
            .unwrap_err();
        assert!(matches!(err, DsxError::Template(_)));
        assert!(PlaceholderRenderer.render("{{ }}", &json!({})).is_err());
    }
}
