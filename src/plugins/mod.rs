//! Plugin contracts, construction settings and the built-in catalog.
//!
//! Extractors read a fetched page and produce one data-bag entry. Generators
//! read the finished data bag and produce artifacts. Both are registered in a
//! [`PluginRegistry`] under a string identifier that doubles as their data-bag
//! or generation-report key.
//!
//! # Module Structure
//!
//! - [`registry`] - namespaces, discovery roots and resolution
//! - [`extractors`] - `colors`, `fonts`, `css`, `structure`, `branding`
//! - [`generators`] - `json`, `css`, `modern-css`, `design-tokens`, `tailwind`, `html`, `brand-assets`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::analysis::{LogoWeights, DEFAULT_MAX_COLORS};
use crate::page::{Document, StyleQuery};
use crate::types::{Artifact, DataBag};
use crate::{DsxError, Result};

pub mod extractors;
pub mod generators;
pub mod registry;

pub use registry::{
    builtin_catalog, BuiltinCatalog, DiscoveryRoot, DiscoveryWarning, ManifestEntry, ManifestRoot,
    PluginCandidate, PluginFactory, PluginInfo, PluginManifest, PluginRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Extractor,
    Generator,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PluginKind::Extractor => "extractor",
            PluginKind::Generator => "generator",
        })
    }
}

impl FromStr for PluginKind {
    type Err = DsxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extractor" => Ok(PluginKind::Extractor),
            "generator" => Ok(PluginKind::Generator),
            other => Err(DsxError::Config(format!("Unknown plugin kind: {}", other))),
        }
    }
}

/// Derives one category of structured data from a fetched page.
pub trait Extractor: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Must not mutate the page; failures are reported as [`DsxError::Extraction`].
    fn extract(&self, document: &Document, styles: &dyn StyleQuery, url: &Url)
        -> Result<serde_json::Value>;
}

/// What a generator receives: the target URL and the finished data bag.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub url: &'a str,
    pub data: &'a DataBag,
}

/// Renders extracted data into one or more artifacts.
#[async_trait]
pub trait Generator: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Output format name shown by `dsx plugins`.
    fn format(&self) -> &str;

    /// Without a destination, returns inline content and writes nothing.
    async fn generate(
        &self,
        input: &GenerationInput<'_>,
        output: Option<&OutputDestination>,
    ) -> Result<Vec<Artifact>>;
}

/// A registered plugin, dispatched by variant.
#[derive(Clone)]
pub enum Capability {
    Extractor(Arc<dyn Extractor>),
    Generator(Arc<dyn Generator>),
}

impl Capability {
    pub fn kind(&self) -> PluginKind {
        match self {
            Capability::Extractor(_) => PluginKind::Extractor,
            Capability::Generator(_) => PluginKind::Generator,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Capability::Extractor(e) => e.description(),
            Capability::Generator(g) => g.description(),
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Extractor(e) => write!(f, "Extractor({})", e.id()),
            Capability::Generator(g) => write!(f, "Generator({})", g.id()),
        }
    }
}

/// Per-generator construction settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Optional template rendered with the generator's context.
    pub template: Option<PathBuf>,
    /// Subdirectory of the output destination; defaults to the generator id.
    pub subdir: Option<String>,
}

/// Settings handed to every plugin factory at construction time.
#[derive(Debug, Clone)]
pub struct PluginSettings {
    pub max_colors: usize,
    pub logo_weights: LogoWeights,
    pub asset_timeout: Duration,
    pub asset_max_bytes: u64,
    pub user_agent: String,
    pub generators: HashMap<String, GeneratorSettings>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            max_colors: DEFAULT_MAX_COLORS,
            logo_weights: LogoWeights::default(),
            asset_timeout: Duration::from_secs(10),
            asset_max_bytes: 5 * 1024 * 1024,
            user_agent: crate::fetch::DEFAULT_USER_AGENT.to_string(),
            generators: HashMap::new(),
        }
    }
}

impl PluginSettings {
    pub fn generator(&self, id: &str) -> GeneratorSettings {
        self.generators.get(id).cloned().unwrap_or_default()
    }
}

/// Directory generators write into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDestination {
    root: PathBuf,
}

impl OutputDestination {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates `root/subdir` if missing and returns it.
    pub async fn ensure_dir(&self, subdir: &str) -> Result<PathBuf> {
        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Writes `contents` to `root/subdir/name` and returns the path.
    pub async fn write(&self, subdir: &str, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.ensure_dir(subdir).await?.join(name);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plugin_kind_round_trips_through_text() {
        assert_eq!("Generator".parse::<PluginKind>().unwrap(), PluginKind::Generator);
        assert_eq!(PluginKind::Extractor.to_string(), "extractor");
        assert!("loader".parse::<PluginKind>().is_err());
    }

    #[test]
    fn generator_settings_default_when_absent() {
        let settings = PluginSettings::default();
        assert_eq!(settings.generator("css"), GeneratorSettings::default());
        assert_eq!(settings.max_colors, 10);
    }

    #[tokio::test]
    async fn destination_writes_under_subdir() {
        let dir = TempDir::new().expect("tempdir");
        let dest = OutputDestination::new(dir.path());
        let path = dest.write("css", "styles.css", b":root {}").await.unwrap();
        assert_eq!(path, dir.path().join("css").join("styles.css"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), ":root {}");
    }
}
