use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

use crate::plugins::PluginKind;

#[derive(Debug, Error)]
pub enum DsxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to fetch page: {reason}")]
    FetchFailed { reason: String },

    #[error("Unknown {kind} plugin: {id}")]
    UnknownPlugin { kind: PluginKind, id: String },

    #[error("Duplicate {kind} identifier: {id}")]
    DuplicateIdentifier { kind: PluginKind, id: String },

    #[error("Extractor '{plugin}' failed: {message}")]
    Extraction { plugin: String, message: String },

    #[error("Generator '{plugin}' failed: {message}")]
    Generation { plugin: String, message: String },

    #[error("Asset download failed for {url}: {reason}")]
    AssetDownloadFailed { url: String, reason: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl DsxError {
    pub fn fetch_failed(reason: impl Into<String>) -> Self {
        DsxError::FetchFailed {
            reason: reason.into(),
        }
    }

    pub fn extraction(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        DsxError::Extraction {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    pub fn generation(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        DsxError::Generation {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    pub fn asset_download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        DsxError::AssetDownloadFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Errors a run recovers from; everything else aborts it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DsxError::Extraction { .. }
                | DsxError::Generation { .. }
                | DsxError::AssetDownloadFailed { .. }
        )
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            DsxError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions and that the output directory is writable.",
            ),
            DsxError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity/proxy/VPN and retry.",
            ),
            DsxError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify URL/format (e.g., https://example.com).",
            ),
            DsxError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON/serialization inputs; run with --verbose for details.",
            ),
            DsxError::FetchFailed { reason } => fetch_payload(reason),
            DsxError::UnknownPlugin { kind, id } => ErrorPayload::new(
                ErrorCategory::Plugin,
                format!("Unknown {} plugin: {}", kind, id),
                "Run `dsx plugins` to list registered extractors and generators.",
            ),
            DsxError::DuplicateIdentifier { kind, id } => ErrorPayload::new(
                ErrorCategory::Plugin,
                format!("Duplicate {} identifier: {}", kind, id),
                "Give every plugin in a manifest a unique id within its kind.",
            ),
            DsxError::Extraction { plugin, message } => ErrorPayload::new(
                ErrorCategory::Plugin,
                format!("Extractor '{}' failed: {}", plugin, message),
                "Re-run with --verbose or disable the extractor with --extractors.",
            ),
            DsxError::Generation { plugin, message } => ErrorPayload::new(
                ErrorCategory::Plugin,
                format!("Generator '{}' failed: {}", plugin, message),
                "Re-run with --verbose or disable the generator with --generators.",
            ),
            DsxError::AssetDownloadFailed { url, reason } => ErrorPayload::new(
                ErrorCategory::Network,
                format!("Asset download failed for {}: {}", url, reason),
                "The asset was skipped; raise [assets] timeout in the config if the host is slow.",
            ),
            DsxError::Template(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check the template path configured under [generators.<id>].",
            ),
            DsxError::Config(msg) => config_payload(msg),
            DsxError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

fn fetch_payload(reason: &str) -> ErrorPayload {
    let lower = reason.to_ascii_lowercase();
    let message = format!("Failed to fetch page: {}", reason);
    let remediation = if lower.contains("playwright npm package is missing") {
        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`), or use --mode static."
    } else if lower.contains("chromium executable") {
        "Run `npx playwright install chromium` (or `playwright install chromium`) to download the browser."
    } else if lower.contains("not found on path") || lower.contains("node command") {
        "Install Node.js and ensure the node binary is on PATH, or use --mode static."
    } else if lower.contains("timeout") || lower.contains("timed out") {
        "Try increasing --nav-timeout/--network-idle-timeout/--process-timeout or ensure the page loads without blocking."
    } else if lower.contains("snapshot") {
        "Verify the --snapshot file exists and contains a DOM snapshot JSON document."
    } else if lower.contains("status") {
        "The server rejected the request; check the URL and whether the page requires authentication."
    } else {
        "Check the URL and network connectivity; run with --verbose for details."
    };
    ErrorPayload::new(ErrorCategory::Fetch, message, remediation)
}

fn config_payload(msg: &str) -> ErrorPayload {
    let lower = msg.to_ascii_lowercase();
    let remediation = if lower.contains("viewport") {
        "Use WIDTHxHEIGHT with positive values (e.g., --viewport 1440x900)."
    } else if lower.contains("manifest") {
        "Check the plugin manifest YAML listed under [plugins] manifests."
    } else if lower.contains("timeout") {
        "Timeouts must be positive durations (e.g., \"30s\")."
    } else {
        "Check flags/paths (e.g., --config PATH) and the TOML config sections."
    };
    ErrorPayload::new(ErrorCategory::Config, msg.to_string(), remediation)
}

pub type Result<T> = std::result::Result<T, DsxError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Fetch,
    Plugin,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
