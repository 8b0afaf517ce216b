//! Article identifiers: normalization and classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::validate::{doi_file_stem, looks_like_doi, sanitize_identifier, ValidationError};

/// Prefix stripped from PMC ids before use.
const PMC_PREFIX: &str = "PMC";

bitflags::bitflags! {
    /// Set of identifier kinds a strategy is able to resolve
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IdentifierKinds: u8 {
        const PMC = 1 << 0;
        const DOI = 1 << 1;
        const QUERY = 1 << 2;
    }
}

/// What an identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// Bare numeric PubMed Central id
    Pmc,
    /// DOI, bare (`10.x/y`) or as a resolver URL
    Doi,
    /// Anything else, used as a free-text search term
    Query,
}

impl IdentifierKind {
    /// The flag for this kind
    pub fn as_flag(self) -> IdentifierKinds {
        match self {
            IdentifierKind::Pmc => IdentifierKinds::PMC,
            IdentifierKind::Doi => IdentifierKinds::DOI,
            IdentifierKind::Query => IdentifierKinds::QUERY,
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Pmc => write!(f, "pmc"),
            IdentifierKind::Doi => write!(f, "doi"),
            IdentifierKind::Query => write!(f, "query"),
        }
    }
}

/// Normalize a raw identifier.
///
/// Trims whitespace and strips any case-insensitive `PMC` prefix, repeatedly,
/// so `normalize(normalize(x)) == normalize(x)`. Fails when nothing is left.
pub fn normalize(raw: &str) -> Result<String, ValidationError> {
    let mut value = raw.trim();

    while value
        .get(..PMC_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(PMC_PREFIX))
    {
        value = value[PMC_PREFIX.len()..].trim_start();
    }

    if value.is_empty() {
        return Err(ValidationError::InvalidIdentifier(format!(
            "'{}' is empty after normalization",
            raw.trim()
        )));
    }

    sanitize_identifier(value)
}

/// A normalized, classified article identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleIdentifier {
    raw: String,
    value: String,
    kind: IdentifierKind,
}

impl ArticleIdentifier {
    /// Normalize and classify a raw identifier
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let value = normalize(raw)?;
        let kind = classify(&value);

        Ok(Self {
            raw: raw.trim().to_string(),
            value,
            kind,
        })
    }

    /// The identifier exactly as the caller gave it (trimmed)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized value (`5334499` for `PMC5334499`)
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// The canonical PMC accession (`PMC5334499`), for PMC ids only
    pub fn pmcid(&self) -> Option<String> {
        (self.kind == IdentifierKind::Pmc).then(|| format!("{}{}", PMC_PREFIX, self.value))
    }

    /// Default file stem for artifacts resolved from this identifier
    pub fn file_stem(&self) -> String {
        match self.kind {
            IdentifierKind::Pmc => self.value.clone(),
            IdentifierKind::Doi if looks_like_doi(&self.value) => doi_file_stem(&self.value),
            _ => self
                .value
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
                .collect(),
        }
    }
}

impl fmt::Display for ArticleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IdentifierKind::Pmc => write!(f, "{}{}", PMC_PREFIX, self.value),
            _ => write!(f, "{}", self.value),
        }
    }
}

fn classify(value: &str) -> IdentifierKind {
    let lower = value.to_ascii_lowercase();

    if value.chars().all(|c| c.is_ascii_digit()) {
        IdentifierKind::Pmc
    } else if lower.starts_with("http://") || lower.starts_with("https://") || looks_like_doi(value)
    {
        IdentifierKind::Doi
    } else {
        IdentifierKind::Query
    }
}
