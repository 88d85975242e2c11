//! Headless page capture through Playwright.
//!
//! This module renders a page with Playwright via Node.js and captures its DOM
//! with computed styles. It backs the `rendered` fetch mode.
//!
//! # Module Structure
//!
//! - [`manager`] - Browser session management with concurrency control
//! - [`playwright`] - Playwright capture script and availability checks
//! - [`dom`] - Raw capture output and conversion
//!
//! # Example
//!
//! ```no_run
//! use dsx_lib::{BrowserManager, BrowserOptions};
//!
//! # async fn example() -> dsx_lib::Result<()> {
//! let manager = BrowserManager::new(BrowserOptions::default());
//! let snapshot = manager.capture("https://example.com").await?;
//! println!("captured {} nodes", snapshot.nodes.len());
//! # Ok(())
//! # }
//! ```

mod dom;
mod manager;
mod playwright;

pub use manager::{
    BrowserManager, BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT,
    DEFAULT_PROCESS_TIMEOUT,
};
