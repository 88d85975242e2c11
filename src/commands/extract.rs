use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use dsx_lib::output::DSX_OUTPUT_VERSION;
use dsx_lib::{
    build_fetcher, DsxError, DsxOutput, Engine, ExtractOutput, ExtractionRequest,
    OutputDestination, ProgressCallback,
};
use tracing::debug;
use url::Url;

use super::{build_registry, load_manifests};
use crate::cli::ExtractArgs;
use crate::formatting::{exit_code_for_report, render_error, write_output};
use crate::settings::{
    format_effective_config, load_config, resolve_extract_settings, ExtractFlagSources,
};

/// Run the extract command.
pub async fn run_extract(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    args: ExtractArgs,
) -> ExitCode {
    let format = args.format;
    let report_path = args.report.clone();

    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, report_path),
    };
    let flag_sources = ExtractFlagSources::from_args(raw_args);
    let manifests = load_manifests(&config);
    let resolved = resolve_extract_settings(&args, &config, &manifests, &flag_sources);
    if verbose {
        eprintln!(
            "{}",
            format_effective_config(&resolved, config_path.as_deref())
        );
    }

    let url = match Url::parse(args.url.trim()) {
        Ok(url) => url,
        Err(err) => return render_error(DsxError::InvalidUrl(err), format, report_path),
    };

    let progress: Option<ProgressCallback> = if verbose {
        Some(Arc::new(|msg: &str| eprintln!("{msg}")))
    } else {
        None
    };
    let fetcher = match build_fetcher(&resolved.fetch, resolved.viewport, progress.clone()) {
        Ok(f) => f,
        Err(err) => return render_error(err, format, report_path),
    };

    let (registry, warnings) = build_registry(&config);
    let engine = Engine::new(Arc::new(registry), fetcher).with_progress(progress);

    let mut request = ExtractionRequest::new(url);
    request.extractors = resolved.extractors;
    request.generators = resolved.generators;
    request.output = args.output.as_ref().map(OutputDestination::new);
    debug!(
        extractors = ?request.extractors,
        generators = ?request.generators,
        output = ?args.output,
        "starting extraction"
    );

    let report = match engine.run(&request).await {
        Ok(report) => report,
        Err(err) => return render_error(err, format, report_path),
    };

    let code = exit_code_for_report(&report);
    let body = DsxOutput::Extract(ExtractOutput {
        version: DSX_OUTPUT_VERSION.to_string(),
        fetch_mode: resolved.fetch.mode,
        output_dir: args.output.clone(),
        warnings,
        report,
    });
    if let Err(err) = write_output(&body, format, report_path.clone()) {
        return render_error(DsxError::Config(err.to_string()), format, report_path);
    }
    code
}
