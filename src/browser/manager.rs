//! Browser manager for coordinating headless capture sessions.
//!
//! `BrowserManager` runs the Playwright capture script under a semaphore and
//! serves as the `rendered` [`PageFetcher`].

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use super::dom::{convert_raw_dom, ScriptResultWithDom};
use super::playwright::{
    ensure_node_available, ensure_playwright_available, map_playwright_error,
    map_playwright_status_error, map_spawn_error, ScriptError, PLAYWRIGHT_CAPTURE_SCRIPT,
};
use crate::page::{FetchedPage, PageFetcher, SnapshotPage};
use crate::progress::{log_progress, ProgressCallback};
use crate::types::DomSnapshot;
use crate::{DsxError, Result, Viewport};

/// Default timeout for page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for waiting for network idle state.
pub const DEFAULT_NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the entire Playwright process.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(45);

/// Configuration options for browser sessions.
#[derive(Clone)]
pub struct BrowserOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    /// Viewport dimensions for the browser.
    pub viewport: Viewport,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Timeout for page navigation.
    pub navigation_timeout: Duration,
    /// Timeout for waiting for network idle state.
    pub network_idle_timeout: Duration,
    /// Timeout for the entire Playwright process.
    pub process_timeout: Duration,
    /// Maximum number of concurrent browser sessions.
    pub max_concurrent_sessions: usize,
    /// User agent override; empty keeps Playwright's default.
    pub user_agent: String,
    /// Optional progress callback for human-readable status lines.
    pub progress: Option<ProgressCallback>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            viewport: Viewport::default(),
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            max_concurrent_sessions: 1,
            user_agent: String::new(),
            progress: None,
        }
    }
}

impl std::fmt::Debug for BrowserOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserOptions")
            .field("node_command", &self.node_command)
            .field("viewport", &self.viewport)
            .field("headless", &self.headless)
            .field("navigation_timeout", &self.navigation_timeout)
            .field("network_idle_timeout", &self.network_idle_timeout)
            .field("process_timeout", &self.process_timeout)
            .field("max_concurrent_sessions", &self.max_concurrent_sessions)
            .finish_non_exhaustive()
    }
}

/// Manages concurrent browser sessions with semaphore-based limiting.
#[derive(Debug, Clone)]
pub struct BrowserManager {
    options: BrowserOptions,
    semaphore: Arc<Semaphore>,
}

impl BrowserManager {
    /// Creates a new BrowserManager with the given options.
    pub fn new(options: BrowserOptions) -> Self {
        let permits = options.max_concurrent_sessions.max(1);
        Self {
            options,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Loads `url` in a headless browser and captures its DOM with computed styles.
    pub async fn capture(&self, url: &str) -> Result<DomSnapshot> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| DsxError::fetch_failed("Browser manager unavailable"))?;

        let options = &self.options;
        let progress = &options.progress;
        log_progress(
            progress,
            &format!(
                "Launching headless browser for {} ({}x{}, nav {}s, idle {}s)…",
                url,
                options.viewport.width,
                options.viewport.height,
                options.navigation_timeout.as_secs(),
                options.network_idle_timeout.as_secs()
            ),
        );
        // Fail fast if Node is missing to avoid spawning Playwright unnecessarily.
        ensure_node_available(&options.node_command).await?;
        ensure_playwright_available(&options.node_command).await?;

        let mut cmd = Command::new(&options.node_command);
        cmd.arg("-e")
            .arg(PLAYWRIGHT_CAPTURE_SCRIPT)
            .arg(url)
            .arg(options.viewport.width.to_string())
            .arg(options.viewport.height.to_string())
            .arg(options.navigation_timeout.as_millis().to_string())
            .arg(options.network_idle_timeout.as_millis().to_string())
            .arg(if options.headless { "1" } else { "0" })
            .arg(&options.user_agent)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log_progress(progress, "Navigating and waiting for network idle (Playwright)…");
        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &options.node_command))?;

        let stdout_task = tokio::spawn(drain(child.stdout.take()));
        let stderr_task = tokio::spawn(drain(child.stderr.take()));

        let status = match timeout(options.process_timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                return Err(DsxError::fetch_failed(format!(
                    "Waiting for Playwright failed: {}",
                    err
                )))
            }
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                log_progress(
                    progress,
                    "Playwright timed out; process killed after exceeding timeout.",
                );
                return Err(DsxError::fetch_failed(format!(
                    "Playwright timed out after {:?}",
                    options.process_timeout
                )));
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(map_playwright_error(status.to_string(), &stderr));
        }

        let stdout = String::from_utf8_lossy(&stdout);
        let snapshot = parse_capture_output(&stdout)?;

        debug!(
            url,
            nodes = snapshot.nodes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "captured rendered page"
        );
        log_progress(
            progress,
            &format!("Capture finished in {:.1}s", start.elapsed().as_secs_f32()),
        );
        Ok(snapshot)
    }
}

/// Reads a child pipe to the end; a missing or broken pipe yields what was read.
async fn drain<R>(pipe: Option<R>) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

/// Parses the capture script's stdout into a snapshot.
pub(crate) fn parse_capture_output(stdout: &str) -> Result<DomSnapshot> {
    let result: ScriptResultWithDom = serde_json::from_str(stdout.trim()).map_err(|e| {
        DsxError::fetch_failed(format!(
            "Failed to parse Playwright output: {} - raw: {}",
            e,
            stdout.trim()
        ))
    })?;

    if result.status != "ok" {
        if let Ok(err) = serde_json::from_str::<ScriptError>(stdout.trim()) {
            return Err(map_playwright_status_error(&err.status, err.message));
        }
        return Err(DsxError::fetch_failed(format!(
            "Playwright returned non-ok status: {}",
            result.status
        )));
    }

    let dom_data = result.dom.ok_or_else(|| {
        DsxError::fetch_failed("Playwright returned ok status but no DOM data")
    })?;

    Ok(convert_raw_dom(dom_data))
}

#[async_trait]
impl PageFetcher for BrowserManager {
    async fn fetch(&self, url: &Url) -> Result<Box<dyn FetchedPage>> {
        let mut snapshot = self.capture(url.as_str()).await?;
        if snapshot.url.is_none() {
            snapshot.url = Some(url.to_string());
        }
        Ok(Box::new(SnapshotPage::new(snapshot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_options_default_values() {
        let opts = BrowserOptions::default();
        assert_eq!(opts.node_command, "node");
        assert!(opts.headless);
        assert_eq!(opts.max_concurrent_sessions, 1);
        assert_eq!(opts.viewport.width, 1440);
        assert_eq!(opts.viewport.height, 900);
        assert_eq!(opts.navigation_timeout, DEFAULT_NAVIGATION_TIMEOUT);
        assert_eq!(opts.network_idle_timeout, DEFAULT_NETWORK_IDLE_TIMEOUT);
        assert_eq!(opts.process_timeout, DEFAULT_PROCESS_TIMEOUT);
        assert!(opts.progress.is_none());
    }

    #[test]
    fn semaphore_never_zero() {
        let manager = BrowserManager::new(BrowserOptions {
            max_concurrent_sessions: 0,
            ..BrowserOptions::default()
        });

        assert_eq!(manager.semaphore.available_permits(), 1);
    }

    #[test]
    fn capture_output_error_status_maps_to_fetch_failure() {
        let err = parse_capture_output(
            r#"{"status":"error","message":"Navigation timeout of 30000ms exceeded"}"#,
        )
        .unwrap_err();
        match err {
            DsxError::FetchFailed { reason } => assert!(reason.contains("--nav-timeout")),
            other => panic!("expected fetch failure, got {other:?}"),
        }
    }

    #[test]
    fn capture_output_requires_dom() {
        let err = parse_capture_output(r#"{"status":"ok"}"#).unwrap_err();
        assert!(err.to_string().contains("no DOM data"));
        assert!(parse_capture_output("not json").is_err());
    }

    #[tokio::test]
    async fn fetch_fails_when_node_is_missing() {
        let manager = BrowserManager::new(BrowserOptions {
            node_command: "definitely-not-a-binary".to_string(),
            ..BrowserOptions::default()
        });

        let url = Url::parse("https://example.com").unwrap();
        let result = manager.fetch(&url).await;
        assert!(matches!(result, Err(DsxError::FetchFailed { .. })));
    }
}
