//! Design System Extractor (DSX) Library
//!
//! Pulls a visual design system (colors, fonts, branding, page structure) out
//! of a web page and renders it into reusable artifacts: a JSON report, CSS
//! custom properties, design tokens, a Tailwind config and downloaded brand
//! assets.
//!
//! # Module Overview
//!
//! - [`fetch`] - Page fetchers (rendered via Playwright, static HTML, snapshot file)
//! - [`browser`] - Headless Playwright capture
//! - [`page`] - Fetched-page document and style queries
//! - [`analysis`] - Color normalization, font classification, logo scoring
//! - [`plugins`] - Extractor/generator contracts, registry and built-ins
//! - [`engine`] - Two-phase extraction and generation run
//! - [`config`] - Configuration file support
//! - [`types`] - Core data types and structures
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dsx_lib::{build_fetcher, Engine, ExtractionRequest, FetchSettings, PluginRegistry, PluginSettings, Viewport};
//!
//! # async fn example() -> dsx_lib::Result<()> {
//! let registry = PluginRegistry::with_builtins(&PluginSettings::default())?;
//! let fetcher = build_fetcher(&FetchSettings::default(), Viewport::default(), None)?;
//! let engine = Engine::new(Arc::new(registry), fetcher);
//!
//! let request = ExtractionRequest::new(url::Url::parse("https://example.com")?);
//! let report = engine.run(&request).await?;
//! println!("{} extractors ran", report.data_bag.len());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod browser;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod output;
pub mod page;
pub mod plugins;
pub mod progress;
pub mod template;
pub mod types;
pub mod viewport;

pub use browser::{
    BrowserManager, BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT,
    DEFAULT_PROCESS_TIMEOUT,
};
pub use config::Config;
pub use engine::{Engine, ExtractionRequest, Phase};
pub use error::{DsxError, ErrorCategory, ErrorPayload, Result};
pub use fetch::{
    build_fetcher, FetchMode, FetchSettings, SnapshotFetcher, StaticFetcher, DEFAULT_USER_AGENT,
};
pub use output::{DsxOutput, ErrorOutput, ExtractOutput, PluginsOutput, DSX_OUTPUT_VERSION};
pub use page::{Document, FetchedPage, PageFetcher, PageGuard, SnapshotPage, StyleProperty, StyleQuery};
pub use plugins::{
    Capability, DiscoveryRoot, DiscoveryWarning, Extractor, GenerationInput, Generator,
    GeneratorSettings, ManifestRoot, OutputDestination, PluginInfo, PluginKind, PluginManifest,
    PluginRegistry, PluginSettings, BuiltinCatalog,
};
pub use progress::ProgressCallback;
pub use template::{PlaceholderRenderer, TemplateRenderer};
pub use types::{Artifact, ArtifactLocation, DataBag, DomNode, DomSnapshot, RunReport};
pub use viewport::Viewport;
