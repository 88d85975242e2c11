mod extract;
mod plugins;

pub use extract::run_extract;
pub use plugins::run_plugins;

use dsx_lib::{
    BuiltinCatalog, Config, DiscoveryRoot, DiscoveryWarning, ManifestRoot, PluginManifest,
    PluginRegistry,
};

/// Registry built from the compiled-in catalog plus every configured manifest.
pub(crate) fn build_registry(config: &Config) -> (PluginRegistry, Vec<DiscoveryWarning>) {
    let manifest_roots: Vec<ManifestRoot> = config
        .plugins
        .manifests
        .iter()
        .map(ManifestRoot::new)
        .collect();
    let mut roots: Vec<&dyn DiscoveryRoot> = vec![&BuiltinCatalog];
    roots.extend(manifest_roots.iter().map(|r| r as &dyn DiscoveryRoot));

    let mut registry = PluginRegistry::new();
    let warnings = registry.discover(&roots, &config.plugin_settings());
    (registry, warnings)
}

/// Manifests that parse; unreadable ones are already reported by discovery.
pub(crate) fn load_manifests(config: &Config) -> Vec<PluginManifest> {
    config
        .plugins
        .manifests
        .iter()
        .filter_map(|path| PluginManifest::load(path).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsx_lib::PluginKind;
    use tempfile::TempDir;

    #[test]
    fn registry_includes_builtins_and_manifest_aliases() {
        let dir = TempDir::new().expect("tempdir");
        let manifest = dir.path().join("plugins.yaml");
        std::fs::write(
            &manifest,
            "enabled_extractors: [colors]\nplugins:\n  - kind: generator\n    id: tokens-alt\n    builtin: design-tokens\n",
        )
        .expect("write manifest");

        let mut config = Config::default();
        config.plugins.manifests = vec![manifest, dir.path().join("missing.yaml")];

        let (registry, warnings) = build_registry(&config);
        assert!(registry.contains(PluginKind::Extractor, "branding"));
        assert!(registry.contains(PluginKind::Generator, "tokens-alt"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].source.ends_with("missing.yaml"));

        let manifests = load_manifests(&config);
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].enabled_extractors, vec!["colors"]);
    }
}
