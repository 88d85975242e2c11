//! Core data types shared by fetchers, plugins and the engine.
//!
//! - [`dom`] - captured DOM snapshot with computed styles
//! - [`report`] - data bag, artifacts and run reports

mod dom;
mod report;

pub use dom::{BoundingBox, ComputedStyle, DomNode, DomSnapshot};
pub use report::{
    Artifact, ArtifactLocation, DataBag, GenerationOutcome, GenerationReport, OrderedMap,
    PluginFailure, RunMetadata, RunReport,
};
