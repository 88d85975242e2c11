//! Playwright integration for headless page capture.
//!
//! This module contains the inline Playwright capture script, error mapping,
//! and availability checks for Node.js and Playwright.

use crate::{DsxError, Result};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Playwright script that loads a page and prints its DOM snapshot.
///
/// Arguments: url, width, height, navigation ms, network-idle ms, headless
/// flag (`1`/`0`), user agent.
pub(crate) const PLAYWRIGHT_CAPTURE_SCRIPT: &str = r#"
const [, url, width, height, navTimeout, idleTimeout, headlessFlag, userAgent] = process.argv;

async function run() {
  let browser;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch({ headless: headlessFlag !== '0' });
    const contextOptions = {
      viewport: {
        width: parseInt(width, 10),
        height: parseInt(height, 10)
      }
    };
    if (userAgent) {
      contextOptions.userAgent = userAgent;
    }
    const context = await browser.newContext(contextOptions);
    const page = await context.newPage();
    const navMs = parseInt(navTimeout, 10);
    const idleMs = parseInt(idleTimeout, 10);

    await page.goto(url, { waitUntil: 'networkidle', timeout: navMs });
    await page.waitForLoadState('networkidle', { timeout: idleMs });

    const domSnapshot = await page.evaluate(() => {
      const nodes = [];
      let nodeId = 0;
      const FULL_TEXT = new Set(['style', 'title']);
      const SKIPPED = new Set(['script', 'noscript', 'template']);

      function getComputedStyleInfo(el) {
        const style = window.getComputedStyle(el);
        const borderColor = style.borderTopStyle !== 'none' ? style.borderTopColor : '';
        return {
          fontFamily: style.fontFamily || '',
          fontSize: style.fontSize || '',
          fontWeight: style.fontWeight || '',
          lineHeight: style.lineHeight || '',
          color: style.color || '',
          backgroundColor: style.backgroundColor || '',
          borderColor: borderColor || '',
          display: style.display || '',
          visibility: style.visibility || ''
        };
      }

      function traverse(el, parentId) {
        const tag = el.tagName.toLowerCase();
        if (SKIPPED.has(tag)) return null;

        const id = `n${nodeId++}`;
        const node = {
          id,
          tag,
          children: [],
          parent: parentId,
          attributes: {},
          text: null,
          boundingBox: null,
          computedStyle: null
        };
        nodes.push(node);

        for (const attr of el.attributes) {
          node.attributes[attr.name] = attr.value;
        }

        if (FULL_TEXT.has(tag)) {
          node.text = el.textContent;
        } else {
          for (const child of el.childNodes) {
            if (child.nodeType === Node.TEXT_NODE) {
              const trimmed = child.textContent.trim();
              if (trimmed) {
                node.text = node.text ? node.text + ' ' + trimmed : trimmed;
              }
            }
          }
        }

        if (el.closest('body')) {
          const rect = el.getBoundingClientRect();
          node.boundingBox = { x: rect.x, y: rect.y, width: rect.width, height: rect.height };
          node.computedStyle = getComputedStyleInfo(el);
        }

        for (const child of el.children) {
          const childId = traverse(child, id);
          if (childId) node.children.push(childId);
        }

        return id;
      }

      traverse(document.documentElement, null);

      return {
        url: window.location.href,
        title: document.title,
        nodes
      };
    });

    console.log(JSON.stringify({ status: 'ok', dom: domSnapshot }));
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    console.error(JSON.stringify({ status: 'error', message }));
    process.exitCode = 1;
  } finally {
    if (browser) {
      await browser.close();
    }
  }
}

run();
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

const MISSING_PLAYWRIGHT: &str =
    "Playwright npm package is missing; install with `npm install playwright`.";

const MISSING_CHROMIUM: &str =
    "Chromium executable is missing; run `npx playwright install chromium`.";

/// Error result from the Playwright script.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ScriptError {
    pub status: String,
    pub message: String,
}

/// Maps a spawn error to a fetch failure.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> DsxError {
    if err.kind() == io::ErrorKind::NotFound {
        DsxError::fetch_failed(format!(
            "Unable to spawn Playwright helper; '{}' was not found on PATH",
            command
        ))
    } else {
        DsxError::fetch_failed(format!("Unable to spawn Playwright helper: {}", err))
    }
}

/// Maps Playwright stderr output to a fetch failure.
pub(crate) fn map_playwright_error(status_text: impl Into<String>, stderr: &str) -> DsxError {
    if let Ok(error) = serde_json::from_str::<ScriptError>(stderr.trim()) {
        return map_playwright_status_error(&error.status, error.message);
    }

    let lower = stderr.to_ascii_lowercase();

    if lower.contains("cannot find module 'playwright'") {
        return DsxError::fetch_failed(MISSING_PLAYWRIGHT);
    }

    if lower.contains("executable doesn't exist") {
        return DsxError::fetch_failed(MISSING_CHROMIUM);
    }

    if lower.contains("timeout") {
        return DsxError::fetch_failed(
            "Playwright timed out; try increasing --nav-timeout/--network-idle-timeout or --process-timeout, and ensure the page finishes loading.",
        );
    }

    DsxError::fetch_failed(format!(
        "Playwright exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

/// Maps a Playwright status error to a fetch failure.
pub(crate) fn map_playwright_status_error(status: &str, message: String) -> DsxError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        DsxError::fetch_failed(MISSING_PLAYWRIGHT)
    } else if lower.contains("executable doesn't exist") {
        DsxError::fetch_failed(MISSING_CHROMIUM)
    } else if lower.contains("timeout") {
        DsxError::fetch_failed(format!(
            "Playwright error (status {}): {}. Hint: increase --nav-timeout/--network-idle-timeout or --process-timeout, and ensure the page finishes loading.",
            status, message
        ))
    } else {
        DsxError::fetch_failed(format!("Playwright error (status {}): {}", status, message))
    }
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            DsxError::fetch_failed(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(DsxError::fetch_failed(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures the Playwright npm package is installed.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            DsxError::fetch_failed(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(
            format!("{:?}", output.status),
            &stderr,
        ));
    }

    Ok(())
}
