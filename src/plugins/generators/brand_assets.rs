//! Downloads the logo, favicon and touch icons found by the branding extractor.

use async_trait::async_trait;
use image::ImageFormat;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{branding, OutputTarget};
use crate::plugins::extractors::branding::BrandingRecord;
use crate::plugins::{Capability, GenerationInput, Generator, OutputDestination, PluginSettings};
use crate::types::Artifact;
use crate::{DsxError, Result};

pub const MANIFEST_NAME: &str = "manifest.json";

/// One asset referenced by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    pub role: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedAsset {
    role: String,
    url: String,
    file: String,
    media_type: String,
    bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct SkippedAsset {
    url: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct Manifest<'a, T: Serialize> {
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<&'a str>,
    assets: Vec<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<SkippedAsset>,
}

/// Sniffed image type of a downloaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    pub extension: &'static str,
    pub media_type: &'static str,
}

pub struct BrandAssetsGenerator {
    id: String,
    target: OutputTarget,
    client: Client,
    max_bytes: u64,
}

impl BrandAssetsGenerator {
    pub fn new(id: &str, settings: &PluginSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.asset_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(DsxError::Network)?;
        Ok(Self {
            id: id.to_string(),
            target: OutputTarget::new(id, settings),
            client,
            max_bytes: settings.asset_max_bytes,
        })
    }

    /// Single attempt; any failure is an [`DsxError::AssetDownloadFailed`].
    async fn download(&self, url: &str) -> Result<(Vec<u8>, ImageKind)> {
        let fail = |reason: String| DsxError::asset_download(url, reason);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("status {}", status.as_u16())));
        }
        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(fail(format!("{} bytes exceeds limit of {}", len, self.max_bytes)));
            }
        }
        let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(fail(format!(
                "{} bytes exceeds limit of {}",
                bytes.len(),
                self.max_bytes
            )));
        }
        let kind = sniff_image(&bytes).ok_or_else(|| fail("response is not an image".into()))?;
        Ok((bytes.to_vec(), kind))
    }

    fn pretty<T: Serialize>(&self, value: &T) -> Result<String> {
        serde_json::to_string_pretty(value)
            .map_err(|e| DsxError::generation(&self.id, e.to_string()))
    }

    async fn save_all(
        &self,
        assets: &[AssetRef],
        dest: &OutputDestination,
    ) -> Result<(Vec<SavedAsset>, Vec<SkippedAsset>, Vec<Artifact>)> {
        let mut saved = Vec::new();
        let mut skipped = Vec::new();
        let mut artifacts = Vec::new();
        for asset in assets {
            match self.download(&asset.url).await {
                Ok((bytes, kind)) => {
                    let file = format!("{}.{}", asset.role, kind.extension);
                    let path = dest.write(&self.target.subdir, &file, &bytes).await?;
                    debug!(url = %asset.url, file = %file, bytes = bytes.len(), "saved brand asset");
                    artifacts.push(Artifact::file(file.clone(), kind.media_type, path));
                    saved.push(SavedAsset {
                        role: asset.role.clone(),
                        url: asset.url.clone(),
                        file,
                        media_type: kind.media_type.to_string(),
                        bytes: bytes.len(),
                    });
                }
                Err(e) => {
                    warn!(generator = %self.id, error = %e, "skipping brand asset");
                    skipped.push(SkippedAsset {
                        url: asset.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok((saved, skipped, artifacts))
    }
}

pub fn factory(id: &str, settings: &PluginSettings) -> Result<Capability> {
    Ok(Capability::Generator(Arc::new(BrandAssetsGenerator::new(
        id, settings,
    )?)))
}

#[async_trait]
impl Generator for BrandAssetsGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Downloads logo, favicon and touch icons with a manifest"
    }

    fn format(&self) -> &str {
        "brand-assets"
    }

    async fn generate(
        &self,
        input: &GenerationInput<'_>,
        output: Option<&OutputDestination>,
    ) -> Result<Vec<Artifact>> {
        let record = branding(input.data).unwrap_or_default();
        let assets = asset_refs(&record);
        let organization = record.organization.as_deref();

        let Some(dest) = output else {
            let manifest = Manifest {
                source: input.url,
                organization,
                assets,
                skipped: Vec::new(),
            };
            let content = self.pretty(&manifest)?;
            return Ok(vec![Artifact::inline(MANIFEST_NAME, "application/json", content)]);
        };

        let (saved, skipped, mut artifacts) = self.save_all(&assets, dest).await?;
        let manifest = Manifest {
            source: input.url,
            organization,
            assets: saved,
            skipped,
        };
        let content = self.pretty(&manifest)?;
        artifacts.push(
            self.target
                .emit(Some(dest), MANIFEST_NAME, "application/json", content)
                .await?,
        );
        Ok(artifacts)
    }
}

/// Logo, favicon and touch icons in that order, without duplicate URLs.
pub fn asset_refs(record: &BrandingRecord) -> Vec<AssetRef> {
    fn push(refs: &mut Vec<AssetRef>, role: String, url: &str) {
        if !refs.iter().any(|r| r.url == url) {
            refs.push(AssetRef {
                role,
                url: url.to_string(),
            });
        }
    }

    let mut refs: Vec<AssetRef> = Vec::new();
    if let Some(url) = record.logo_url.as_deref() {
        push(&mut refs, "logo".into(), url);
    }
    if let Some(url) = record.favicon_url.as_deref() {
        push(&mut refs, "favicon".into(), url);
    }
    for (i, icon) in record.apple_touch_icons.iter().enumerate() {
        let role = match icon.sizes.as_deref() {
            Some(sizes) if sizes.chars().all(|c| c.is_ascii_alphanumeric()) => {
                format!("apple-touch-icon-{}", sizes)
            }
            _ => format!("apple-touch-icon-{}", i + 1),
        };
        // roles name the saved files, so a repeated size gets the icon index too
        let role = if refs.iter().any(|r| r.role == role) {
            format!("{}-{}", role, i + 1)
        } else {
            role
        };
        push(&mut refs, role, &icon.url);
    }
    refs
}

/// Identifies raster formats by signature and SVG by its root element.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
    if let Ok(format) = image::guess_format(bytes) {
        let (extension, media_type) = match format {
            ImageFormat::Png => ("png", "image/png"),
            ImageFormat::Jpeg => ("jpg", "image/jpeg"),
            ImageFormat::Gif => ("gif", "image/gif"),
            ImageFormat::WebP => ("webp", "image/webp"),
            ImageFormat::Ico => ("ico", "image/x-icon"),
            ImageFormat::Bmp => ("bmp", "image/bmp"),
            ImageFormat::Tiff => ("tiff", "image/tiff"),
            _ => return None,
        };
        return Some(ImageKind {
            extension,
            media_type,
        });
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]).to_ascii_lowercase();
    let head = head.trim_start_matches('\u{feff}').trim_start();
    let is_svg = head.starts_with("<svg")
        || ((head.starts_with("<?xml") || head.starts_with("<!doctype svg")) && head.contains("<svg"));
    is_svg.then_some(ImageKind {
        extension: "svg",
        media_type: "image/svg+xml",
    })
}
