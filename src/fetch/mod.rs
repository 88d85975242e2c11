//! Page fetchers and the settings that select one.
//!
//! - `rendered` - Playwright capture through [`BrowserManager`]
//! - `static` - plain HTTP GET parsed with `scraper` ([`StaticFetcher`])
//! - `snapshot` - a DOM snapshot JSON file ([`SnapshotFetcher`])
//!
//! Setting `DSX_MOCK_PAGE` to a snapshot path forces the snapshot fetcher
//! regardless of mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::browser::{
    BrowserManager, BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT,
    DEFAULT_PROCESS_TIMEOUT,
};
use crate::page::PageFetcher;
use crate::progress::ProgressCallback;
use crate::{DsxError, Result, Viewport};

mod snapshot;
mod static_html;

pub use snapshot::SnapshotFetcher;
pub use static_html::StaticFetcher;
pub(crate) use static_html::parse_html;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; dsx/",
    env!("CARGO_PKG_VERSION"),
    "; design system extractor)"
);

/// Environment variable naming a snapshot file that replaces every fetch.
pub const MOCK_PAGE_ENV: &str = "DSX_MOCK_PAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Rendered,
    Static,
    Snapshot,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchMode::Rendered => "rendered",
            FetchMode::Static => "static",
            FetchMode::Snapshot => "snapshot",
        })
    }
}

impl FromStr for FetchMode {
    type Err = DsxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rendered" => Ok(FetchMode::Rendered),
            "static" => Ok(FetchMode::Static),
            "snapshot" => Ok(FetchMode::Snapshot),
            other => Err(DsxError::Config(format!(
                "Unknown fetch mode '{}': expected rendered, static or snapshot",
                other
            ))),
        }
    }
}

/// Everything needed to build a fetcher; the `[fetch]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub mode: FetchMode,
    pub node_command: String,
    pub headless: bool,
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub process_timeout: Duration,
    pub user_agent: String,
    /// Snapshot file for `snapshot` mode.
    pub snapshot: Option<PathBuf>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            mode: FetchMode::default(),
            node_command: "node".to_string(),
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            snapshot: None,
        }
    }
}

/// Builds the fetcher selected by `settings`, honoring [`MOCK_PAGE_ENV`].
pub fn build_fetcher(
    settings: &FetchSettings,
    viewport: Viewport,
    progress: Option<ProgressCallback>,
) -> Result<Arc<dyn PageFetcher>> {
    if let Some(path) = std::env::var_os(MOCK_PAGE_ENV).filter(|p| !p.is_empty()) {
        debug!(path = ?path, "using mock page snapshot");
        return Ok(Arc::new(SnapshotFetcher::new(path)));
    }

    debug!(mode = %settings.mode, "building page fetcher");
    match settings.mode {
        FetchMode::Rendered => Ok(Arc::new(BrowserManager::new(BrowserOptions {
            node_command: settings.node_command.clone(),
            viewport,
            headless: settings.headless,
            navigation_timeout: settings.navigation_timeout,
            network_idle_timeout: settings.network_idle_timeout,
            process_timeout: settings.process_timeout,
            max_concurrent_sessions: 1,
            user_agent: settings.user_agent.clone(),
            progress,
        }))),
        FetchMode::Static => Ok(Arc::new(StaticFetcher::new(
            &settings.user_agent,
            settings.navigation_timeout,
        )?)),
        FetchMode::Snapshot => {
            let path = settings.snapshot.clone().ok_or_else(|| {
                DsxError::Config(
                    "Fetch mode 'snapshot' requires a snapshot file (--snapshot FILE)".to_string(),
                )
            })?;
            Ok(Arc::new(SnapshotFetcher::new(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_mode_parses_and_displays() {
        assert_eq!("Static".parse::<FetchMode>().unwrap(), FetchMode::Static);
        assert_eq!(FetchMode::Snapshot.to_string(), "snapshot");
        assert!("headless".parse::<FetchMode>().is_err());
    }

    #[test]
    fn fetch_settings_read_humantime_durations() {
        let settings: FetchSettings = toml::from_str(
            r#"
            mode = "static"
            navigation_timeout = "12s"
            process_timeout = "1m"
            "#,
        )
        .unwrap();
        assert_eq!(settings.mode, FetchMode::Static);
        assert_eq!(settings.navigation_timeout, Duration::from_secs(12));
        assert_eq!(settings.process_timeout, Duration::from_secs(60));
        assert_eq!(settings.network_idle_timeout, DEFAULT_NETWORK_IDLE_TIMEOUT);
        assert_eq!(settings.node_command, "node");
    }

    #[test]
    fn snapshot_mode_requires_a_path() {
        if std::env::var_os(MOCK_PAGE_ENV).is_some() {
            return;
        }
        let settings = FetchSettings {
            mode: FetchMode::Snapshot,
            ..FetchSettings::default()
        };
        let err = build_fetcher(&settings, Viewport::default(), None)
            .err()
            .expect("missing snapshot path must fail");
        assert!(matches!(err, DsxError::Config(_)));
    }

    #[test]
    fn default_user_agent_names_the_tool() {
        assert!(DEFAULT_USER_AGENT.contains("dsx/"));
    }
}
