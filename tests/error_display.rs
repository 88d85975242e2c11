use dsx_lib::{DsxError, PluginKind};

#[test]
fn config_error_display_includes_message() {
    let err = DsxError::Config("missing viewport".to_string());

    assert_eq!(format!("{}", err), "Configuration error: missing viewport");
}

#[test]
fn io_error_display_wraps_source() {
    let io_err = std::io::Error::other("disk full");
    let err: DsxError = io_err.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("IO error: "));
    assert!(rendered.contains("disk full"));
}

#[test]
fn fetch_failed_helper_includes_reason() {
    let err = DsxError::fetch_failed("GET https://acme.test/ returned status 503");

    assert_eq!(
        format!("{}", err),
        "Failed to fetch page: GET https://acme.test/ returned status 503"
    );
}

#[test]
fn plugin_errors_name_kind_and_identifier() {
    let unknown = DsxError::UnknownPlugin {
        kind: PluginKind::Extractor,
        id: "motion".to_string(),
    };
    assert_eq!(format!("{}", unknown), "Unknown extractor plugin: motion");

    let duplicate = DsxError::DuplicateIdentifier {
        kind: PluginKind::Generator,
        id: "css".to_string(),
    };
    assert_eq!(format!("{}", duplicate), "Duplicate generator identifier: css");
}

#[test]
fn extraction_and_generation_helpers_use_plugin_id() {
    assert_eq!(
        format!("{}", DsxError::extraction("fonts", "no text nodes")),
        "Extractor 'fonts' failed: no text nodes"
    );
    assert_eq!(
        format!("{}", DsxError::generation("tailwind", "no colors")),
        "Generator 'tailwind' failed: no colors"
    );
}

#[test]
fn asset_download_helper_includes_url_and_reason() {
    let err = DsxError::asset_download("https://acme.test/logo.svg", "status 404");

    assert_eq!(
        format!("{}", err),
        "Asset download failed for https://acme.test/logo.svg: status 404"
    );
}
