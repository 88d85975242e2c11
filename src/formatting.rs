use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use dsx_lib::output::DSX_OUTPUT_VERSION;
use dsx_lib::{ArtifactLocation, DsxError, DsxOutput, ErrorOutput, RunReport};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &DsxOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: DsxError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = DsxOutput::Error(ErrorOutput {
        version: DSX_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is fatal; plugin failures use 1.
    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &DsxOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &DsxOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &DsxOutput, colorize: bool) -> String {
    let ok = |passed: bool| {
        if passed {
            color("ok", "32", colorize)
        } else {
            color("failed", "31", colorize)
        }
    };

    match body {
        DsxOutput::Extract(out) => {
            let mut buf = String::new();
            let report = &out.report;
            let status = if report.is_clean() { "DONE" } else { "PARTIAL" };
            let status_colored = color(status, if report.is_clean() { "32" } else { "33" }, colorize);
            writeln!(buf, "{} Design system extraction", status_colored).ok();
            writeln!(buf, "URL: {} (fetch: {})", report.url, out.fetch_mode).ok();
            if let Some(dir) = &out.output_dir {
                writeln!(buf, "Output: {}", dir.display()).ok();
            }

            if !report.metadata.extractors_used.is_empty() {
                writeln!(buf, "Extractors:").ok();
                for id in &report.metadata.extractors_used {
                    let failure = report.extraction_errors.iter().find(|f| &f.plugin == id);
                    match failure {
                        Some(f) => writeln!(buf, "- {:12} {} ({})", id, ok(false), f.message).ok(),
                        None => writeln!(buf, "- {:12} {}", id, ok(true)).ok(),
                    };
                }
            }

            if !report.generation.is_empty() {
                writeln!(buf, "Generators:").ok();
                for (id, outcome) in report.generation.iter() {
                    match &outcome.error {
                        Some(message) => {
                            writeln!(buf, "- {:12} {} ({})", id, ok(false), message).ok();
                        }
                        None => {
                            writeln!(buf, "- {:12} {}", id, ok(true)).ok();
                        }
                    }
                    for artifact in &outcome.artifacts {
                        let location = match &artifact.location {
                            ArtifactLocation::File { path } => path.display().to_string(),
                            ArtifactLocation::Inline { content } => {
                                format!("inline, {} bytes", content.len())
                            }
                        };
                        writeln!(buf, "    {} ({})", artifact.name, location).ok();
                    }
                }
            }

            if !out.warnings.is_empty() {
                writeln!(buf, "Warnings:").ok();
                for w in &out.warnings {
                    writeln!(buf, "- {}: {}", w.source, w.message).ok();
                }
            }
            buf
        }
        DsxOutput::Plugins(out) => {
            let mut buf = String::new();
            let header = color("[PLUGINS]", "36", colorize);
            writeln!(buf, "{} {} registered", header, out.plugins.len()).ok();
            for info in &out.plugins {
                let format = info
                    .format
                    .as_deref()
                    .map(|f| format!(" [{}]", f))
                    .unwrap_or_default();
                writeln!(
                    buf,
                    "- {:9} {:14} {}{}",
                    info.kind.to_string(), info.id, info.description, format
                )
                .ok();
            }
            if !out.warnings.is_empty() {
                writeln!(buf, "Warnings:").ok();
                for w in &out.warnings {
                    writeln!(buf, "- {}: {}", w.source, w.message).ok();
                }
            }
            buf
        }
        DsxOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Exit code for a completed run: 1 when any plugin failed.
pub fn exit_code_for_report(report: &RunReport) -> ExitCode {
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsx_lib::error::{ErrorCategory, ErrorPayload};
    use dsx_lib::types::{GenerationOutcome, GenerationReport, PluginFailure, RunMetadata};
    use dsx_lib::{
        Artifact, DataBag, DiscoveryWarning, ExtractOutput, FetchMode, PluginInfo, PluginKind,
        PluginsOutput,
    };
    use serde_json::json;

    fn report(extraction_errors: Vec<PluginFailure>, generation: GenerationReport) -> RunReport {
        let mut data_bag = DataBag::new();
        data_bag.insert("colors", json!([]));
        RunReport {
            url: "https://acme.test/".into(),
            data_bag,
            generation,
            extraction_errors,
            metadata: RunMetadata {
                extractors_used: vec!["colors".into(), "fonts".into()],
                generators_used: vec!["css".into()],
                generated_at_ms: 0,
            },
        }
    }

    #[test]
    fn exit_code_for_report_maps_clean_and_partial() {
        assert_eq!(
            exit_code_for_report(&report(Vec::new(), GenerationReport::new())),
            ExitCode::SUCCESS
        );
        let failed = report(
            vec![PluginFailure {
                plugin: "fonts".into(),
                kind: PluginKind::Extractor,
                message: "boom".into(),
            }],
            GenerationReport::new(),
        );
        assert_eq!(exit_code_for_report(&failed), ExitCode::from(1));

        let mut generation = GenerationReport::new();
        generation.insert(
            "css",
            GenerationOutcome {
                artifacts: Vec::new(),
                error: Some("template missing".into()),
            },
        );
        assert_eq!(
            exit_code_for_report(&report(Vec::new(), generation)),
            ExitCode::from(1)
        );
    }

    #[test]
    fn render_error_always_returns_fatal_exit_code() {
        let code = render_error(
            DsxError::Config("boom".to_string()),
            OutputFormat::Json,
            None,
        );
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn format_pretty_lists_plugins_artifacts_and_failures() {
        let mut generation = GenerationReport::new();
        generation.insert(
            "css",
            GenerationOutcome {
                artifacts: vec![
                    Artifact::file("styles.css", "text/css", PathBuf::from("out/css/styles.css")),
                    Artifact::inline("extra.css", "text/css", ":root{}".into()),
                ],
                error: None,
            },
        );
        let output = DsxOutput::Extract(ExtractOutput {
            version: DSX_OUTPUT_VERSION.to_string(),
            fetch_mode: FetchMode::Snapshot,
            output_dir: Some(PathBuf::from("out")),
            warnings: vec![DiscoveryWarning {
                source: "plugins.yaml".into(),
                identifier: None,
                message: "unreadable".into(),
            }],
            report: report(
                vec![PluginFailure {
                    plugin: "fonts".into(),
                    kind: PluginKind::Extractor,
                    message: "no fonts".into(),
                }],
                generation,
            ),
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("PARTIAL Design system extraction"));
        assert!(pretty.contains("URL: https://acme.test/ (fetch: snapshot)"));
        assert!(pretty.contains("colors") && pretty.contains("ok"));
        assert!(pretty.contains("failed (no fonts)"));
        assert!(pretty.contains("out/css/styles.css"));
        assert!(pretty.contains("inline, 7 bytes"));
        assert!(pretty.contains("plugins.yaml: unreadable"));
    }

    #[test]
    fn format_pretty_lists_registered_plugins() {
        let output = DsxOutput::Plugins(PluginsOutput {
            version: DSX_OUTPUT_VERSION.to_string(),
            plugins: vec![PluginInfo {
                kind: PluginKind::Generator,
                id: "tailwind".into(),
                description: "Tailwind theme config".into(),
                format: Some("js".into()),
            }],
            warnings: Vec::new(),
        });
        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("[PLUGINS] 1 registered"));
        assert!(pretty.contains("tailwind"));
        assert!(pretty.contains("[js]"));
    }

    #[test]
    fn format_pretty_handles_errors() {
        let output = DsxOutput::Error(ErrorOutput {
            version: DSX_OUTPUT_VERSION.to_string(),
            message: Some("bad input".to_string()),
            error: ErrorPayload {
                category: ErrorCategory::Config,
                message: "bad input".to_string(),
                remediation: Some("check flags".to_string()),
            },
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("[ERROR] bad input"));
        assert!(pretty.contains("Hint: check flags"));
    }
}
