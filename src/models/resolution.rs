//! Requests, per-strategy outcomes and resolution reports.

use serde::{Deserialize, Serialize};

use super::artifact::{ArtifactFile, ArtifactKind, ResolutionCandidate};
use super::identifier::ArticleIdentifier;

/// Typed outcome of one strategy attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Attempt {
    /// Candidates, most preferred first
    Found { candidates: Vec<ResolutionCandidate> },

    /// The source has nothing for this identifier; fall through
    NotFound { reason: String },

    /// The source could not be queried (network, status, unparseable body); fall through
    SoftFailure { reason: String },
}

impl Attempt {
    pub fn found(candidates: Vec<ResolutionCandidate>) -> Self {
        if candidates.is_empty() {
            return Attempt::not_found("no candidates");
        }
        Attempt::Found { candidates }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Attempt::NotFound {
            reason: reason.into(),
        }
    }

    pub fn soft_failure(reason: impl Into<String>) -> Self {
        Attempt::SoftFailure {
            reason: reason.into(),
        }
    }

    pub fn candidates(&self) -> &[ResolutionCandidate] {
        match self {
            Attempt::Found { candidates } => candidates,
            _ => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Attempt::Found { .. })
    }
}

/// How far the resolver goes once an artifact has been written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Run every strategy and keep every distinct artifact
    #[default]
    CollectAll,
    /// Stop after the first artifact written
    FirstSuccess,
}

/// What one strategy did during a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy: String,

    #[serde(flatten)]
    pub attempt: Attempt,
}

/// Request to resolve and download one article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// Raw identifier (PMC id, DOI, DOI URL)
    pub identifier: String,

    /// Exact output file name; forces first-success resolution
    pub file_name: Option<String>,

    /// DOI tried when the identifier itself yields no PDF
    pub fallback_doi: Option<String>,
}

impl ResolveRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            file_name: None,
            fallback_doi: None,
        }
    }

    /// Write the artifact under this exact file name
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Try this DOI when the primary identifier produces no PDF
    pub fn fallback_doi(mut self, doi: impl Into<String>) -> Self {
        self.fallback_doi = Some(doi.into());
        self
    }
}

/// Result of a resolution that wrote at least one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub identifier: ArticleIdentifier,

    /// Files written, in the order they were fetched
    pub artifacts: Vec<ArtifactFile>,

    /// Every strategy attempted, in chain order
    pub reports: Vec<StrategyReport>,
}

impl Resolution {
    pub fn new(identifier: ArticleIdentifier) -> Self {
        Self {
            identifier,
            artifacts: Vec::new(),
            reports: Vec::new(),
        }
    }

    /// Total bytes written across all artifacts
    pub fn total_bytes(&self) -> u64 {
        self.artifacts.iter().map(|a| a.bytes).sum()
    }

    pub fn has_pdf(&self) -> bool {
        self.artifacts.iter().any(|a| a.kind == ArtifactKind::Pdf)
    }
}

/// Per-identifier entry of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub identifier: String,

    /// Files written for this identifier (empty on failure)
    pub artifacts: Vec<ArtifactFile>,

    /// Error message if resolution failed
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a batch resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,

    pub successful: usize,

    pub failed: usize,
}

impl BatchReport {
    pub fn push(&mut self, entry: BatchEntry) {
        if entry.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
