//! Orchestration of one extraction run.
//!
//! A run resolves the requested plugins, fetches the page once, runs every
//! extractor against it in registration order, then runs every generator on
//! the finished data bag. Plugin errors and panics are recorded in the
//! [`RunReport`] and never abort the run; only plugin resolution and the fetch
//! itself are fatal.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use url::Url;

use crate::page::{PageFetcher, PageGuard};
use crate::plugins::{
    Extractor, GenerationInput, Generator, OutputDestination, PluginKind, PluginRegistry,
};
use crate::progress::{log_progress, ProgressCallback};
use crate::types::{
    DataBag, GenerationOutcome, GenerationReport, PluginFailure, RunMetadata, RunReport,
};
use crate::{DsxError, Result};

/// Lifecycle of a run. `Failed` is reachable from `Fetching` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Extracting,
    Generating,
    Done,
    Failed,
}

impl Phase {
    /// Moves to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(self, next: Phase) -> Result<Phase> {
        use Phase::*;
        match (self, next) {
            (Idle, Fetching)
            | (Fetching, Extracting)
            | (Fetching, Failed)
            | (Extracting, Generating)
            | (Generating, Done) => Ok(next),
            _ => Err(DsxError::Unknown(format!(
                "illegal run transition {} -> {}",
                self, next
            ))),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Idle => "idle",
            Phase::Fetching => "fetching",
            Phase::Extracting => "extracting",
            Phase::Generating => "generating",
            Phase::Done => "done",
            Phase::Failed => "failed",
        })
    }
}

/// One run's inputs. Empty id lists select every registered plugin of that kind.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub url: Url,
    pub extractors: Vec<String>,
    pub generators: Vec<String>,
    pub output: Option<OutputDestination>,
}

impl ExtractionRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            extractors: Vec::new(),
            generators: Vec::new(),
            output: None,
        }
    }
}

/// Runs extraction requests against a registry and a page fetcher.
pub struct Engine {
    registry: Arc<PluginRegistry>,
    fetcher: Arc<dyn PageFetcher>,
    progress: Option<ProgressCallback>,
}

impl Engine {
    pub fn new(registry: Arc<PluginRegistry>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            registry,
            fetcher,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub async fn run(&self, request: &ExtractionRequest) -> Result<RunReport> {
        let started = Instant::now();
        let extractors = self.registry.resolve_extractors(&request.extractors)?;
        let generators = self.registry.resolve_generators(&request.generators)?;

        let mut phase = Phase::Idle.advance(Phase::Fetching)?;
        info!(url = %request.url, "fetching page");
        log_progress(&self.progress, &format!("Fetching {}…", request.url));
        let page = match self.fetcher.fetch(&request.url).await {
            Ok(page) => PageGuard::new(page),
            Err(err) => {
                phase.advance(Phase::Failed)?;
                let reason = match err {
                    DsxError::FetchFailed { reason } => reason,
                    other => other.to_string(),
                };
                warn!(url = %request.url, %reason, "fetch failed");
                return Err(DsxError::FetchFailed { reason });
            }
        };

        phase = phase.advance(Phase::Extracting)?;
        let mut data_bag = DataBag::new();
        let mut extraction_errors = Vec::new();
        for (id, extractor) in &extractors {
            log_progress(&self.progress, &format!("Running extractor {}…", id));
            match run_extractor(extractor.as_ref(), &page, &request.url) {
                Ok(value) => {
                    debug!(extractor = %id, "extractor finished");
                    data_bag.insert(id.clone(), value);
                }
                Err(message) => {
                    warn!(extractor = %id, %message, "extractor failed");
                    extraction_errors.push(PluginFailure {
                        plugin: id.clone(),
                        kind: PluginKind::Extractor,
                        message,
                    });
                }
            }
        }
        drop(page);

        phase = phase.advance(Phase::Generating)?;
        let url = request.url.to_string();
        let input = GenerationInput {
            url: &url,
            data: &data_bag,
        };
        let mut generation = GenerationReport::new();
        for (id, generator) in &generators {
            log_progress(&self.progress, &format!("Running generator {}…", id));
            let outcome =
                match run_generator(generator.as_ref(), &input, request.output.as_ref()).await {
                    Ok(artifacts) => {
                        debug!(generator = %id, artifacts = artifacts.len(), "generator finished");
                        GenerationOutcome {
                            artifacts,
                            error: None,
                        }
                    }
                    Err(message) => {
                        warn!(generator = %id, %message, "generator failed");
                        GenerationOutcome {
                            artifacts: Vec::new(),
                            error: Some(message),
                        }
                    }
                };
            generation.insert(id.clone(), outcome);
        }

        phase.advance(Phase::Done)?;
        info!(
            url = %request.url,
            extractors = extractors.len(),
            generators = generators.len(),
            failures = extraction_errors.len()
                + generation.values().filter(|o| !o.succeeded()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );
        log_progress(
            &self.progress,
            &format!("Run finished in {:.1}s", started.elapsed().as_secs_f32()),
        );

        Ok(RunReport {
            url,
            data_bag,
            generation,
            extraction_errors,
            metadata: RunMetadata {
                extractors_used: extractors.into_iter().map(|(id, _)| id).collect(),
                generators_used: generators.into_iter().map(|(id, _)| id).collect(),
                generated_at_ms: now_ms(),
            },
        })
    }
}

fn run_extractor(
    extractor: &dyn Extractor,
    page: &PageGuard,
    url: &Url,
) -> std::result::Result<serde_json::Value, String> {
    let document = page.document();
    let styles = page.styles();
    match catch_unwind(AssertUnwindSafe(|| extractor.extract(document, styles, url))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(failure_message(err)),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

async fn run_generator(
    generator: &dyn Generator,
    input: &GenerationInput<'_>,
    output: Option<&OutputDestination>,
) -> std::result::Result<Vec<crate::types::Artifact>, String> {
    match AssertUnwindSafe(generator.generate(input, output))
        .catch_unwind()
        .await
    {
        Ok(Ok(artifacts)) => Ok(artifacts),
        Ok(Err(err)) => Err(failure_message(err)),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

/// Plugin-scoped errors already name the plugin; keep only their message.
fn failure_message(err: DsxError) -> String {
    match err {
        DsxError::Extraction { message, .. } | DsxError::Generation { message, .. } => message,
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_the_run_lifecycle() {
        let phase = Phase::Idle
            .advance(Phase::Fetching)
            .and_then(|p| p.advance(Phase::Extracting))
            .and_then(|p| p.advance(Phase::Generating))
            .and_then(|p| p.advance(Phase::Done))
            .unwrap();
        assert_eq!(phase, Phase::Done);
        assert_eq!(Phase::Fetching.advance(Phase::Failed).unwrap(), Phase::Failed);
    }

    #[test]
    fn phase_rejects_illegal_transitions() {
        assert!(Phase::Idle.advance(Phase::Extracting).is_err());
        assert!(Phase::Extracting.advance(Phase::Failed).is_err());
        assert!(Phase::Generating.advance(Phase::Extracting).is_err());
        assert!(Phase::Done.advance(Phase::Fetching).is_err());
        assert!(Phase::Failed.advance(Phase::Extracting).is_err());
    }

    #[test]
    fn panic_messages_are_recovered() {
        let caught = catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "boom 7");
        let caught = catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "unknown panic payload");
    }

    #[test]
    fn plugin_errors_keep_only_their_message() {
        assert_eq!(failure_message(DsxError::extraction("colors", "no page")), "no page");
        assert!(failure_message(DsxError::Template("bad".into())).contains("Template error"));
    }
}
