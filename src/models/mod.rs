//! Core data models for identifiers, candidates and resolution results.

mod artifact;
pub mod identifier;
mod resolution;

pub use artifact::{ArtifactFile, ArtifactKind, FetchResult, ResolutionCandidate, MAX_DIAGNOSTIC_CHARS};
pub use identifier::{normalize, ArticleIdentifier, IdentifierKind, IdentifierKinds};
pub use resolution::{
    Attempt, BatchEntry, BatchReport, Resolution, ResolutionMode, ResolveRequest, StrategyReport,
};
