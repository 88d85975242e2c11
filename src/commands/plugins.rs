use std::path::PathBuf;
use std::process::ExitCode;

use dsx_lib::output::DSX_OUTPUT_VERSION;
use dsx_lib::{DsxError, DsxOutput, PluginsOutput};

use super::build_registry;
use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::load_config;

/// Run the plugins command.
pub fn run_plugins(config_path: Option<PathBuf>, verbose: bool, format: OutputFormat) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, None),
    };
    let (registry, warnings) = build_registry(&config);
    if verbose {
        eprintln!(
            "Discovered {} plugins from {} manifest(s)",
            registry.list().len(),
            config.plugins.manifests.len()
        );
    }

    let body = DsxOutput::Plugins(PluginsOutput {
        version: DSX_OUTPUT_VERSION.to_string(),
        plugins: registry.list(),
        warnings,
    });
    if let Err(err) = write_output(&body, format, None) {
        return render_error(DsxError::Config(err.to_string()), format, None);
    }
    ExitCode::SUCCESS
}
