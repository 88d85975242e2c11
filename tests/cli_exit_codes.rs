use dsx_lib::DsxOutput;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_snapshot(dir: &Path) -> PathBuf {
    let snapshot = json!({
        "url": "https://acme.test/",
        "title": "Acme Rockets",
        "nodes": [
            {"id": "n0", "tag": "html", "children": ["n1", "n3"]},
            {"id": "n1", "tag": "head", "parent": "n0", "children": ["n2"]},
            {"id": "n2", "tag": "title", "parent": "n1", "text": "Acme Rockets"},
            {"id": "n3", "tag": "body", "parent": "n0", "children": ["n4", "n6", "n7"],
             "computedStyle": {"color": "rgb(17, 17, 17)", "backgroundColor": "rgb(255, 255, 255)",
                               "fontFamily": "Inter, sans-serif"}},
            {"id": "n4", "tag": "header", "parent": "n3", "children": ["n5"]},
            {"id": "n5", "tag": "img", "parent": "n4",
             "attributes": {"src": "/img/logo.svg", "alt": "Acme logo", "class": "site-logo"}},
            {"id": "n6", "tag": "h1", "parent": "n3", "text": "Rockets for everyone",
             "computedStyle": {"color": "rgb(255, 102, 0)", "fontFamily": "\"Playfair Display\", serif"}},
            {"id": "n7", "tag": "button", "parent": "n3", "text": "Buy",
             "computedStyle": {"color": "rgb(255, 255, 255)", "backgroundColor": "rgb(255, 102, 0)",
                               "fontFamily": "Inter, sans-serif"}}
        ]
    });
    let path = dir.join("snapshot.json");
    std::fs::write(&path, serde_json::to_vec(&snapshot).expect("encode snapshot"))
        .expect("write snapshot");
    path
}

fn run_dsx(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dsx"))
        .args(args)
        // Keep a developer's central config out of the run.
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("DSX_MOCK_PAGE")
        .output()
        .expect("run dsx")
}

fn parse_json(stdout: &[u8]) -> DsxOutput {
    serde_json::from_slice(stdout).expect("output should be valid JSON")
}

#[test]
fn extract_from_snapshot_exits_zero_and_reports_data() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());

    let output = run_dsx(
        dir.path(),
        &[
            "extract",
            "--url",
            "https://acme.test/",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--generators",
            "json,css",
        ],
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    match parse_json(&output.stdout) {
        DsxOutput::Extract(out) => {
            let keys: Vec<&str> = out.report.data_bag.keys().collect();
            assert_eq!(keys, vec!["colors", "fonts", "css", "structure", "branding"]);
            let generated: Vec<&str> = out.report.generation.keys().collect();
            assert_eq!(generated, vec!["json", "css"]);
            assert!(out.report.is_clean());
            assert!(out.output_dir.is_none());
        }
        other => panic!("expected extract output, got {other:?}"),
    }
}

#[test]
fn extract_writes_artifacts_under_output_dir() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());
    let out_dir = dir.path().join("out");

    let output = run_dsx(
        dir.path(),
        &[
            "extract",
            "--url",
            "https://acme.test/",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--generators",
            "css,design-tokens",
            "--output",
            out_dir.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(0));
    assert!(out_dir.join("css").join("styles.css").exists());
    assert!(out_dir.join("design-tokens").join("design-tokens.json").exists());
}

#[test]
fn generator_failure_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());
    let cfg_path = dir.path().join("dsx.toml");
    std::fs::write(&cfg_path, "[generators.css]\ntemplate = \"missing.css.tmpl\"\n")
        .expect("write config");

    let output = run_dsx(
        dir.path(),
        &[
            "extract",
            "--url",
            "https://acme.test/",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--generators",
            "json,css",
            "--config",
            cfg_path.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(1));

    match parse_json(&output.stdout) {
        DsxOutput::Extract(out) => {
            assert!(out.report.generation.get("json").unwrap().succeeded());
            let css = out.report.generation.get("css").unwrap();
            assert!(css.error.as_deref().unwrap_or_default().contains("missing.css.tmpl"));
        }
        other => panic!("expected extract output, got {other:?}"),
    }
}

#[test]
fn unknown_generator_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());

    let output = run_dsx(
        dir.path(),
        &[
            "extract",
            "--url",
            "https://acme.test/",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--generators",
            "pdf",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    match parse_json(&output.stdout) {
        DsxOutput::Error(out) => assert!(out.error.message.contains("pdf")),
        other => panic!("expected error output, got {other:?}"),
    }
}

#[test]
fn missing_snapshot_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let output = run_dsx(
        dir.path(),
        &[
            "extract",
            "--url",
            "https://acme.test/",
            "--snapshot",
            dir.path().join("nope.json").to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn invalid_url_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());
    let output = run_dsx(
        dir.path(),
        &[
            "extract",
            "--url",
            "not a url",
            "--snapshot",
            snapshot.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn report_flag_writes_envelope_to_file() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());
    let report = dir.path().join("report.json");

    let output = run_dsx(
        dir.path(),
        &[
            "extract",
            "--url",
            "https://acme.test/",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--generators",
            "json",
            "--report",
            report.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    let written = std::fs::read(&report).expect("report written");
    assert!(matches!(parse_json(&written), DsxOutput::Extract(_)));
}

#[test]
fn plugins_lists_builtins() {
    let dir = TempDir::new().expect("tempdir");
    let output = run_dsx(dir.path(), &["plugins"]);
    assert_eq!(output.status.code(), Some(0));

    match parse_json(&output.stdout) {
        DsxOutput::Plugins(out) => {
            let ids: Vec<&str> = out.plugins.iter().map(|p| p.id.as_str()).collect();
            assert_eq!(
                ids,
                vec![
                    "colors",
                    "fonts",
                    "css",
                    "structure",
                    "branding",
                    "json",
                    "css",
                    "modern-css",
                    "design-tokens",
                    "tailwind",
                    "html",
                    "brand-assets"
                ]
            );
            assert!(out.warnings.is_empty());
        }
        other => panic!("expected plugins output, got {other:?}"),
    }
}
