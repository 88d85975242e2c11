use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

use crate::page::{FetchedPage, PageFetcher, SnapshotPage};
use crate::types::DomSnapshot;
use crate::{DsxError, Result};

/// Serves a pre-captured DOM snapshot file for every URL.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    path: PathBuf,
}

impl SnapshotFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<DomSnapshot> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DsxError::fetch_failed(format!(
                "Unable to read snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DsxError::fetch_failed(format!(
                "Invalid DOM snapshot {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl PageFetcher for SnapshotFetcher {
    async fn fetch(&self, url: &Url) -> Result<Box<dyn FetchedPage>> {
        let mut snapshot = self.load().await?;
        if snapshot.url.is_none() {
            snapshot.url = Some(url.to_string());
        }
        debug!(path = %self.path.display(), nodes = snapshot.nodes.len(), "loaded snapshot page");
        Ok(Box::new(SnapshotPage::new(snapshot)))
    }
}
