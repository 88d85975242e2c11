//! TOML configuration.
//!
//! Loaded from `--config PATH`, else `$XDG_CONFIG_HOME/dsx/config.toml` or
//! `~/.config/dsx/config.toml`, else built-in defaults. Every section is
//! optional.
//!
//! ```toml
//! viewport = "1280x800"
//!
//! [fetch]
//! mode = "static"
//! navigation_timeout = "20s"
//!
//! [plugins]
//! enabled_generators = ["json", "css"]
//! manifests = ["plugins.yaml"]
//!
//! [colors]
//! max_colors = 12
//!
//! [generators.css]
//! template = "templates/styles.css.tmpl"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::{LogoWeights, DEFAULT_MAX_COLORS};
use crate::fetch::FetchSettings;
use crate::plugins::{GeneratorSettings, PluginSettings};
use crate::{DsxError, Result, Viewport};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub viewport: Viewport,
    pub fetch: FetchSettings,
    pub plugins: PluginsConfig,
    pub colors: ColorsConfig,
    pub logo: LogoWeights,
    pub generators: HashMap<String, GeneratorSettings>,
    pub assets: AssetsConfig,
}

/// The `[plugins]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Extractors to run; empty runs every registered extractor.
    pub enabled_extractors: Vec<String>,
    /// Generators to run; empty runs every registered generator.
    pub enabled_generators: Vec<String>,
    /// YAML plugin manifests, relative to the config file.
    pub manifests: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub max_colors: usize,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            max_colors: DEFAULT_MAX_COLORS,
        }
    }
}

/// The `[assets]` section used by `brand-assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub max_bytes: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let defaults = PluginSettings::default();
        Self {
            timeout: defaults.asset_timeout,
            max_bytes: defaults.asset_max_bytes,
        }
    }
}

impl Config {
    /// Explicit path, else the central config if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::central_config_path().filter(|p| p.exists()) {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        let mut config = Self::from_toml(&std::fs::read_to_string(&path)?)?;
        config.resolve_relative_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| DsxError::Config(e.to_string()))
    }

    /// `$XDG_CONFIG_HOME/dsx/config.toml`, falling back to `~/.config/dsx/config.toml`.
    pub fn central_config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME")
                    .filter(|v| !v.is_empty())
                    .map(|home| PathBuf::from(home).join(".config"))
            })?;
        Some(base.join("dsx").join("config.toml"))
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.plugins.manifests.iter_mut().for_each(rebase);
        self.generators
            .values_mut()
            .filter_map(|g| g.template.as_mut())
            .for_each(rebase);
        if let Some(snapshot) = self.fetch.snapshot.as_mut() {
            rebase(snapshot);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(DsxError::Config(
                "viewport width and height must be positive".to_string(),
            ));
        }
        if self.colors.max_colors == 0 {
            return Err(DsxError::Config(
                "[colors] max_colors must be at least 1".to_string(),
            ));
        }
        let timeouts = [
            ("fetch.navigation_timeout", self.fetch.navigation_timeout),
            ("fetch.network_idle_timeout", self.fetch.network_idle_timeout),
            ("fetch.process_timeout", self.fetch.process_timeout),
            ("assets.timeout", self.assets.timeout),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, d)| d.is_zero()) {
            return Err(DsxError::Config(format!("{} must be positive", name)));
        }
        if self.assets.max_bytes == 0 {
            return Err(DsxError::Config(
                "[assets] max_bytes must be positive".to_string(),
            ));
        }
        if self.fetch.node_command.trim().is_empty() {
            return Err(DsxError::Config(
                "[fetch] node_command must not be empty".to_string(),
            ));
        }
        for (id, settings) in &self.generators {
            if let Some(subdir) = &settings.subdir {
                let trimmed = subdir.trim();
                if trimmed.is_empty() || Path::new(trimmed).is_absolute() || trimmed.contains("..") {
                    return Err(DsxError::Config(format!(
                        "[generators.{}] subdir must be a non-empty relative path",
                        id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Construction settings handed to every plugin factory.
    pub fn plugin_settings(&self) -> PluginSettings {
        PluginSettings {
            max_colors: self.colors.max_colors,
            logo_weights: self.logo.clone(),
            asset_timeout: self.assets.timeout,
            asset_max_bytes: self.assets.max_bytes,
            user_agent: self.fetch.user_agent.clone(),
            generators: self.generators.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchMode;
    use tempfile::TempDir;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert_eq!(cfg.viewport.width, 1440);
        assert_eq!(cfg.viewport.height, 900);
        assert_eq!(cfg.fetch.mode, FetchMode::Rendered);
        assert_eq!(cfg.fetch.navigation_timeout, Duration::from_secs(30));
        assert_eq!(cfg.fetch.network_idle_timeout, Duration::from_secs(10));
        assert_eq!(cfg.colors.max_colors, 10);
        assert!(cfg.plugins.enabled_extractors.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_every_section() {
        let cfg = Config::from_toml(
            r#"
            viewport = "1280x720"

            [fetch]
            mode = "static"
            process_timeout = "90s"

            [plugins]
            enabled_extractors = ["colors", "fonts"]

            [colors]
            max_colors = 6

            [logo]
            min_score = 2
            positive_terms = ["logo"]

            [generators.css]
            template = "tpl/styles.css"
            subdir = "styles"

            [assets]
            timeout = "3s"
            max_bytes = 1024
            "#,
        )
        .unwrap();

        assert_eq!(cfg.viewport.width, 1280);
        assert_eq!(cfg.fetch.mode, FetchMode::Static);
        assert_eq!(cfg.fetch.process_timeout, Duration::from_secs(90));
        assert_eq!(cfg.plugins.enabled_extractors, vec!["colors", "fonts"]);
        assert_eq!(cfg.logo.min_score, 2);
        assert_eq!(cfg.logo.src_bonus, LogoWeights::default().src_bonus);

        let settings = cfg.plugin_settings();
        assert_eq!(settings.max_colors, 6);
        assert_eq!(settings.asset_timeout, Duration::from_secs(3));
        assert_eq!(settings.asset_max_bytes, 1024);
        assert_eq!(settings.generator("css").subdir.as_deref(), Some("styles"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.colors.max_colors = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("max_colors"));

        let mut cfg = Config::default();
        cfg.fetch.process_timeout = Duration::ZERO;
        assert!(cfg.validate().unwrap_err().to_string().contains("timeout"));

        let mut cfg = Config::default();
        cfg.generators.insert(
            "css".into(),
            GeneratorSettings {
                template: None,
                subdir: Some("  ".into()),
            },
        );
        assert!(cfg.validate().unwrap_err().to_string().contains("subdir"));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = Config::from_toml("viewport = \"0x10\"").unwrap_err();
        assert!(matches!(err, DsxError::Config(_)));
    }

    #[test]
    fn load_resolves_paths_against_config_dir() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("dsx.toml");
        std::fs::write(
            &path,
            "[plugins]\nmanifests = [\"plugins.yaml\"]\n[generators.css]\ntemplate = \"css.tmpl\"\n",
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.plugins.manifests, vec![dir.path().join("plugins.yaml")]);
        assert_eq!(
            cfg.generators["css"].template.as_deref(),
            Some(dir.path().join("css.tmpl").as_path())
        );
    }

    #[test]
    fn load_of_missing_explicit_file_fails() {
        let dir = TempDir::new().expect("tempdir");
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
