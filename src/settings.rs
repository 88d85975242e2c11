use std::path::Path;
use std::time::Duration;

use dsx_lib::{Config, DsxError, FetchMode, FetchSettings, PluginManifest, Viewport};

use crate::cli::ExtractArgs;

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct ExtractFlagSources {
    pub viewport: bool,
    pub mode: bool,
    pub nav_timeout: bool,
    pub network_idle_timeout: bool,
    pub process_timeout: bool,
}

impl ExtractFlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            viewport: flag_present(args, "--viewport"),
            mode: flag_present(args, "--mode"),
            nav_timeout: flag_present(args, "--nav-timeout"),
            network_idle_timeout: flag_present(args, "--network-idle-timeout"),
            process_timeout: flag_present(args, "--process-timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Resolved settings after merging CLI args, config file and plugin manifests.
#[derive(Debug, Clone)]
pub struct ResolvedExtractSettings {
    pub viewport: Viewport,
    pub fetch: FetchSettings,
    pub extractors: Vec<String>,
    pub generators: Vec<String>,
}

/// Merge CLI arguments with config, preferring CLI when flags are present.
///
/// Enable lists come from the CLI, else `[plugins]` in the config, else the
/// first manifest that declares one; an empty list selects every plugin.
pub fn resolve_extract_settings(
    args: &ExtractArgs,
    config: &Config,
    manifests: &[PluginManifest],
    flags: &ExtractFlagSources,
) -> ResolvedExtractSettings {
    let mut fetch = config.fetch.clone();
    if flags.mode {
        fetch.mode = args.mode.into();
    } else if args.snapshot.is_some() {
        fetch.mode = FetchMode::Snapshot;
    }
    if args.snapshot.is_some() {
        fetch.snapshot = args.snapshot.clone();
    }
    if flags.nav_timeout {
        fetch.navigation_timeout = Duration::from_secs(args.nav_timeout);
    }
    if flags.network_idle_timeout {
        fetch.network_idle_timeout = Duration::from_secs(args.network_idle_timeout);
    }
    if flags.process_timeout {
        fetch.process_timeout = Duration::from_secs(args.process_timeout);
    }

    ResolvedExtractSettings {
        viewport: if flags.viewport {
            args.viewport
        } else {
            config.viewport
        },
        extractors: pick_ids(
            &args.extractors,
            &config.plugins.enabled_extractors,
            manifests.iter().map(|m| &m.enabled_extractors),
        ),
        generators: pick_ids(
            &args.generators,
            &config.plugins.enabled_generators,
            manifests.iter().map(|m| &m.enabled_generators),
        ),
        fetch,
    }
}

fn pick_ids<'a>(
    cli: &Option<Vec<String>>,
    configured: &[String],
    mut from_manifests: impl Iterator<Item = &'a Vec<String>>,
) -> Vec<String> {
    if let Some(ids) = cli {
        return clean_ids(ids);
    }
    if !configured.is_empty() {
        return clean_ids(configured);
    }
    from_manifests
        .find(|ids| !ids.is_empty())
        .map(|ids| clean_ids(ids))
        .unwrap_or_default()
}

fn clean_ids(ids: &[String]) -> Vec<String> {
    ids.iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/dsx/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, DsxError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        DsxError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        DsxError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective settings as a single-line string.
pub fn format_effective_config(
    resolved: &ResolvedExtractSettings,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let list = |ids: &[String]| {
        if ids.is_empty() {
            "all".to_string()
        } else {
            ids.join(",")
        }
    };
    format!(
        "Effective config [{source}]: mode={}, viewport={}x{}, timeouts: nav={}s, network-idle={}s, process={}s, extractors={}, generators={}",
        resolved.fetch.mode,
        resolved.viewport.width,
        resolved.viewport.height,
        resolved.fetch.navigation_timeout.as_secs(),
        resolved.fetch.network_idle_timeout.as_secs(),
        resolved.fetch.process_timeout.as_secs(),
        list(&resolved.extractors),
        list(&resolved.generators),
    )
}
