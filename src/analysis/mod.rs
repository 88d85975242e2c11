//! Heuristics shared by the extractor plugins.
//!
//! - [`color`] - color parsing, deduplication and palette roles
//! - [`font`] - font-family classification and fallback stacks
//! - [`logo`] - logo likelihood scoring for candidate images

pub mod color;
pub mod font;
pub mod logo;

pub use color::{ColorNormalizer, ColorRecord, ColorRole, DEFAULT_MAX_COLORS};
pub use font::{classify, split_family_list, FontClass, FontRecord};
pub use logo::{LogoCandidate, LogoScorer, LogoWeights, ScoredCandidate};
