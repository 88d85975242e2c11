//! Plugin registration, discovery and resolution.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::extractors::{self, branding, colors, fonts, structure};
use super::generators::{brand_assets, css, design_tokens, html, json, modern_css, tailwind};
use super::{Capability, Extractor, Generator, PluginKind, PluginSettings};
use crate::{DsxError, Result};

/// Builds a plugin instance under the given identifier.
pub type PluginFactory = fn(&str, &PluginSettings) -> Result<Capability>;

/// Every plugin compiled into the binary, in default registration order.
pub fn builtin_catalog() -> Vec<(PluginKind, &'static str, PluginFactory)> {
    vec![
        (PluginKind::Extractor, "colors", colors::factory as PluginFactory),
        (PluginKind::Extractor, "fonts", fonts::factory as PluginFactory),
        (PluginKind::Extractor, "css", extractors::css::factory as PluginFactory),
        (PluginKind::Extractor, "structure", structure::factory as PluginFactory),
        (PluginKind::Extractor, "branding", branding::factory as PluginFactory),
        (PluginKind::Generator, "json", json::factory as PluginFactory),
        (PluginKind::Generator, "css", css::factory as PluginFactory),
        (PluginKind::Generator, "modern-css", modern_css::factory as PluginFactory),
        (PluginKind::Generator, "design-tokens", design_tokens::factory as PluginFactory),
        (PluginKind::Generator, "tailwind", tailwind::factory as PluginFactory),
        (PluginKind::Generator, "html", html::factory as PluginFactory),
        (PluginKind::Generator, "brand-assets", brand_assets::factory as PluginFactory),
    ]
}

fn find_builtin(kind: PluginKind, name: &str) -> Option<PluginFactory> {
    builtin_catalog()
        .into_iter()
        .find(|(k, n, _)| *k == kind && *n == name)
        .map(|(_, _, factory)| factory)
}

/// A plugin a discovery root offers for registration.
#[derive(Clone)]
pub struct PluginCandidate {
    pub kind: PluginKind,
    pub identifier: String,
    pub factory: PluginFactory,
}

/// A location that offers plugin candidates.
pub trait DiscoveryRoot {
    /// Human-readable label used in warnings.
    fn label(&self) -> String;

    /// Outer error: the root could not be read. Inner errors: a bad candidate.
    fn scan(&self) -> Result<Vec<Result<PluginCandidate>>>;
}

/// The compiled-in catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl DiscoveryRoot for BuiltinCatalog {
    fn label(&self) -> String {
        "builtin".to_string()
    }

    fn scan(&self) -> Result<Vec<Result<PluginCandidate>>> {
        Ok(builtin_catalog()
            .into_iter()
            .map(|(kind, name, factory)| {
                Ok(PluginCandidate {
                    kind,
                    identifier: name.to_string(),
                    factory,
                })
            })
            .collect())
    }
}

/// A `plugins.yaml` manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginManifest {
    pub enabled_extractors: Vec<String>,
    pub enabled_generators: Vec<String>,
    pub plugins: Vec<ManifestEntry>,
}

/// Registers a built-in implementation under another identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub kind: PluginKind,
    pub id: String,
    pub builtin: String,
}

impl PluginManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DsxError::Config(format!("Failed to read plugin manifest {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            DsxError::Config(format!("Invalid plugin manifest {}: {}", path.display(), e))
        })
    }
}

/// Discovery root backed by a YAML manifest file.
#[derive(Debug, Clone)]
pub struct ManifestRoot {
    path: PathBuf,
}

impl ManifestRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiscoveryRoot for ManifestRoot {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn scan(&self) -> Result<Vec<Result<PluginCandidate>>> {
        let manifest = PluginManifest::load(&self.path)?;
        Ok(manifest
            .plugins
            .into_iter()
            .map(|entry| {
                let factory = find_builtin(entry.kind, &entry.builtin).ok_or_else(|| {
                    DsxError::Config(format!(
                        "manifest entry '{}' names unknown builtin {} '{}'",
                        entry.id, entry.kind, entry.builtin
                    ))
                })?;
                Ok(PluginCandidate {
                    kind: entry.kind,
                    identifier: entry.id,
                    factory,
                })
            })
            .collect())
    }
}

/// A non-fatal problem met during discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryWarning {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub message: String,
}

/// Listing entry for `dsx plugins`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub kind: PluginKind,
    pub id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Two ordered namespaces of registered plugins.
#[derive(Default)]
pub struct PluginRegistry {
    extractors: Vec<(String, Arc<dyn Extractor>)>,
    generators: Vec<(String, Arc<dyn Generator>)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in plugin.
    pub fn with_builtins(settings: &PluginSettings) -> Result<Self> {
        let mut registry = Self::new();
        for (_, name, factory) in builtin_catalog() {
            registry.register(name, factory(name, settings)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, identifier: &str, capability: Capability) -> Result<()> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(DsxError::Config(
                "Plugin identifier must not be empty".to_string(),
            ));
        }
        if self.contains(capability.kind(), identifier) {
            return Err(DsxError::DuplicateIdentifier {
                kind: capability.kind(),
                id: identifier.to_string(),
            });
        }
        debug!(kind = %capability.kind(), id = identifier, "registered plugin");
        match capability {
            Capability::Extractor(e) => self.extractors.push((identifier.to_string(), e)),
            Capability::Generator(g) => self.generators.push((identifier.to_string(), g)),
        }
        Ok(())
    }

    /// Registers every valid candidate the roots offer. Failures become warnings.
    pub fn discover(
        &mut self,
        roots: &[&dyn DiscoveryRoot],
        settings: &PluginSettings,
    ) -> Vec<DiscoveryWarning> {
        let mut warnings = Vec::new();
        let mut note = |source: &str, identifier: Option<&str>, message: String| {
            warn!(source, identifier = identifier.unwrap_or("-"), "{}", message);
            warnings.push(DiscoveryWarning {
                source: source.to_string(),
                identifier: identifier.map(str::to_string),
                message,
            });
        };

        for root in roots {
            let source = root.label();
            let candidates = match root.scan() {
                Ok(list) => list,
                Err(err) => {
                    note(&source, None, err.to_string());
                    continue;
                }
            };
            for candidate in candidates {
                let candidate = match candidate {
                    Ok(c) => c,
                    Err(err) => {
                        note(&source, None, err.to_string());
                        continue;
                    }
                };
                let id = candidate.identifier.as_str();
                let capability = match (candidate.factory)(id, settings) {
                    Ok(cap) => cap,
                    Err(err) => {
                        note(&source, Some(id), err.to_string());
                        continue;
                    }
                };
                if capability.kind() != candidate.kind {
                    note(
                        &source,
                        Some(id),
                        format!(
                            "factory produced a {} but the candidate is a {}",
                            capability.kind(),
                            candidate.kind
                        ),
                    );
                    continue;
                }
                if let Err(err) = self.register(id, capability) {
                    note(&source, Some(id), err.to_string());
                }
            }
        }
        warnings
    }

    pub fn contains(&self, kind: PluginKind, identifier: &str) -> bool {
        match kind {
            PluginKind::Extractor => self.extractors.iter().any(|(id, _)| id == identifier),
            PluginKind::Generator => self.generators.iter().any(|(id, _)| id == identifier),
        }
    }

    /// Requested plugins of `kind` in registration order; empty means all.
    pub fn resolve(&self, kind: PluginKind, identifiers: &[String]) -> Result<Vec<(String, Capability)>> {
        let registered: Vec<(String, Capability)> = match kind {
            PluginKind::Extractor => self
                .extractors
                .iter()
                .map(|(id, e)| (id.clone(), Capability::Extractor(e.clone())))
                .collect(),
            PluginKind::Generator => self
                .generators
                .iter()
                .map(|(id, g)| (id.clone(), Capability::Generator(g.clone())))
                .collect(),
        };
        if identifiers.is_empty() {
            return Ok(registered);
        }
        if let Some(unknown) = identifiers
            .iter()
            .find(|wanted| !registered.iter().any(|(id, _)| id == wanted.trim()))
        {
            return Err(DsxError::UnknownPlugin {
                kind,
                id: unknown.trim().to_string(),
            });
        }
        Ok(registered
            .into_iter()
            .filter(|(id, _)| identifiers.iter().any(|wanted| wanted.trim() == id))
            .collect())
    }

    pub fn resolve_extractors(&self, identifiers: &[String]) -> Result<Vec<(String, Arc<dyn Extractor>)>> {
        Ok(self
            .resolve(PluginKind::Extractor, identifiers)?
            .into_iter()
            .filter_map(|(id, cap)| match cap {
                Capability::Extractor(e) => Some((id, e)),
                Capability::Generator(_) => None,
            })
            .collect())
    }

    pub fn resolve_generators(&self, identifiers: &[String]) -> Result<Vec<(String, Arc<dyn Generator>)>> {
        Ok(self
            .resolve(PluginKind::Generator, identifiers)?
            .into_iter()
            .filter_map(|(id, cap)| match cap {
                Capability::Generator(g) => Some((id, g)),
                Capability::Extractor(_) => None,
            })
            .collect())
    }

    pub fn list(&self) -> Vec<PluginInfo> {
        let extractors = self.extractors.iter().map(|(id, e)| PluginInfo {
            kind: PluginKind::Extractor,
            id: id.clone(),
            description: e.description().to_string(),
            format: None,
        });
        let generators = self.generators.iter().map(|(id, g)| PluginInfo {
            kind: PluginKind::Generator,
            id: id.clone(),
            description: g.description().to_string(),
            format: Some(g.format().to_string()),
        });
        extractors.chain(generators).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Document, StyleQuery};
    use tempfile::TempDir;
    use url::Url;

    struct Named(&'static str);

    impl Extractor for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test extractor"
        }

        fn extract(&self, _: &Document, _: &dyn StyleQuery, _: &Url) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    fn named(id: &'static str) -> Capability {
        Capability::Extractor(Arc::new(Named(id)))
    }

    fn ids(list: &[(String, Capability)]) -> Vec<&str> {
        list.iter().map(|(id, _)| id.as_str()).collect()
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = PluginRegistry::new();
        registry.register("a", named("a")).unwrap();
        let err = registry.register("a", named("a2")).unwrap_err();
        assert!(matches!(
            err,
            DsxError::DuplicateIdentifier { kind: PluginKind::Extractor, ref id } if id == "a"
        ));
        // The first registration is kept.
        let resolved = registry.resolve(PluginKind::Extractor, &[]).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn namespaces_are_independent() {
        let settings = PluginSettings::default();
        let mut registry = PluginRegistry::new();
        registry.register("json", named("json")).unwrap();
        registry
            .register("json", json::factory("json", &settings).unwrap())
            .unwrap();
        assert!(registry.contains(PluginKind::Extractor, "json"));
        assert!(registry.contains(PluginKind::Generator, "json"));
    }

    #[test]
    fn resolve_uses_registration_order() {
        let mut registry = PluginRegistry::new();
        for id in ["c", "a", "b"] {
            registry.register(id, named("x")).unwrap();
        }
        let all = registry.resolve(PluginKind::Extractor, &[]).unwrap();
        assert_eq!(ids(&all), vec!["c", "a", "b"]);

        let some = registry
            .resolve(PluginKind::Extractor, &["b".to_string(), "c".to_string()])
            .unwrap();
        assert_eq!(ids(&some), vec!["c", "b"]);
    }

    #[test]
    fn resolve_rejects_unknown_identifiers() {
        let registry = PluginRegistry::new();
        let err = registry
            .resolve(PluginKind::Generator, &["pdf".to_string()])
            .unwrap_err();
        assert!(matches!(err, DsxError::UnknownPlugin { kind: PluginKind::Generator, .. }));
    }

    #[test]
    fn builtins_register_in_catalog_order() {
        let registry = PluginRegistry::with_builtins(&PluginSettings::default()).unwrap();
        let extractors = registry.resolve(PluginKind::Extractor, &[]).unwrap();
        assert_eq!(ids(&extractors), vec!["colors", "fonts", "css", "structure", "branding"]);
        let generators = registry.resolve(PluginKind::Generator, &[]).unwrap();
        assert_eq!(
            ids(&generators),
            vec!["json", "css", "modern-css", "design-tokens", "tailwind", "html", "brand-assets"]
        );
    }

    fn failing_factory(_: &str, _: &PluginSettings) -> Result<Capability> {
        Err(DsxError::Config("factory exploded".to_string()))
    }

    struct ScriptedRoot(Vec<Result<PluginCandidate>>);

    impl DiscoveryRoot for ScriptedRoot {
        fn label(&self) -> String {
            "scripted".to_string()
        }

        fn scan(&self) -> Result<Vec<Result<PluginCandidate>>> {
            Ok(self
                .0
                .iter()
                .map(|c| match c {
                    Ok(c) => Ok(c.clone()),
                    Err(e) => Err(DsxError::Config(e.to_string())),
                })
                .collect())
        }
    }

    #[test]
    fn discovery_continues_past_bad_candidates() {
        let root = ScriptedRoot(vec![
            Ok(PluginCandidate {
                kind: PluginKind::Extractor,
                identifier: "broken".into(),
                factory: failing_factory,
            }),
            Err(DsxError::Config("unloadable".into())),
            Ok(PluginCandidate {
                kind: PluginKind::Extractor,
                identifier: "colors".into(),
                factory: colors::factory,
            }),
            Ok(PluginCandidate {
                kind: PluginKind::Generator,
                identifier: "colors".into(),
                factory: colors::factory,
            }),
        ]);
        let missing = ManifestRoot::new("/definitely/not/here/plugins.yaml");

        let mut registry = PluginRegistry::new();
        let roots: [&dyn DiscoveryRoot; 2] = [&root, &missing];
        let warnings = registry.discover(&roots, &PluginSettings::default());

        assert_eq!(warnings.len(), 4);
        assert_eq!(warnings[0].identifier.as_deref(), Some("broken"));
        assert!(warnings[2].message.contains("factory produced"));
        assert_eq!(warnings[3].source, "/definitely/not/here/plugins.yaml");
        assert!(registry.contains(PluginKind::Extractor, "colors"));
        assert!(!registry.contains(PluginKind::Extractor, "broken"));
    }

    #[test]
    fn manifest_aliases_builtins_and_reports_duplicates() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("plugins.yaml");
        std::fs::write(
            &path,
            "enabled_generators: [css-compact]\nplugins:\n  - kind: generator\n    id: css-compact\n    builtin: css\n  - kind: generator\n    id: json\n    builtin: json\n  - kind: extractor\n    id: mystery\n    builtin: nope\n",
        )
        .unwrap();

        let manifest = PluginManifest::load(&path).unwrap();
        assert_eq!(manifest.enabled_generators, vec!["css-compact"]);

        let settings = PluginSettings::default();
        let mut registry = PluginRegistry::new();
        let manifest_root = ManifestRoot::new(&path);
        let roots: [&dyn DiscoveryRoot; 2] = [&BuiltinCatalog, &manifest_root];
        let warnings = registry.discover(&roots, &settings);

        assert!(registry.contains(PluginKind::Generator, "css-compact"));
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings.iter().any(|w| w.message.contains("Duplicate")));
        assert!(warnings.iter().any(|w| w.message.contains("unknown builtin")));
    }
}
