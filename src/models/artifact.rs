//! Candidates, fetch results and the artifacts written to disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Longest diagnostic kept on a failed fetch
pub const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// Kind of binary artifact a candidate URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Compressed package with full text and figures
    Archive,
    Pdf,
}

impl ArtifactKind {
    /// Map an OA-service `format` attribute to an artifact kind
    pub fn from_format(format: &str) -> Option<Self> {
        match format.trim().to_ascii_lowercase().as_str() {
            "tgz" | "tar.gz" => Some(ArtifactKind::Archive),
            "pdf" => Some(ArtifactKind::Pdf),
            _ => None,
        }
    }

    /// File extension, without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Archive => "tar.gz",
            ArtifactKind::Pdf => "pdf",
        }
    }

    /// Lower sorts first; archives beat PDFs
    pub fn preference(self) -> u8 {
        match self {
            ArtifactKind::Archive => 0,
            ArtifactKind::Pdf => 1,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Archive => write!(f, "archive"),
            ArtifactKind::Pdf => write!(f, "pdf"),
        }
    }
}

/// A resolved download location produced by a strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionCandidate {
    /// Absolute download URL
    pub url: Url,

    pub kind: ArtifactKind,

    /// Id of the strategy that produced this candidate
    pub strategy: String,

    /// Overrides the identifier-derived file stem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_stem: Option<String>,
}

impl ResolutionCandidate {
    pub fn new(url: Url, kind: ArtifactKind, strategy: impl Into<String>) -> Self {
        Self {
            url,
            kind,
            strategy: strategy.into(),
            file_stem: None,
        }
    }

    /// Set the file stem used when persisting this candidate
    pub fn file_stem(mut self, stem: impl Into<String>) -> Self {
        self.file_stem = Some(stem.into());
        self
    }

    /// File name for this candidate given the identifier's default stem
    pub fn file_name(&self, default_stem: &str) -> String {
        format!(
            "{}.{}",
            self.file_stem.as_deref().unwrap_or(default_stem),
            self.kind.extension()
        )
    }
}

/// Outcome of downloading one candidate
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// Response body (empty on failure)
    pub bytes: Vec<u8>,

    pub success: bool,

    /// Why the fetch failed, bounded to [`MAX_DIAGNOSTIC_CHARS`]
    pub message: Option<String>,
}

impl FetchResult {
    pub fn success(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let message: String = message.into();
        let message = if message.chars().count() > MAX_DIAGNOSTIC_CHARS {
            let mut cut: String = message.chars().take(MAX_DIAGNOSTIC_CHARS - 3).collect();
            cut.push_str("...");
            cut
        } else {
            message
        };

        Self {
            bytes: Vec::new(),
            success: false,
            message: Some(message),
        }
    }
}

/// A file written for a successful fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: PathBuf,

    /// Number of bytes written
    pub bytes: u64,

    pub kind: ArtifactKind,

    /// Strategy whose candidate produced the file
    pub strategy: String,
}
