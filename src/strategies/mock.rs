//! Mock strategy for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use crate::models::{ArticleIdentifier, ArtifactKind, Attempt, IdentifierKinds, ResolutionCandidate};
use crate::strategies::{Strategy, StrategyError};

/// A strategy that returns a predefined outcome and counts its calls.
#[derive(Debug)]
pub struct MockStrategy {
    id: String,
    accepts: IdentifierKinds,
    outcome: Result<Attempt, StrategyError>,
    calls: AtomicUsize,
}

impl MockStrategy {
    /// Create a mock that always answers with `outcome`.
    pub fn new(id: impl Into<String>, accepts: IdentifierKinds, outcome: Result<Attempt, StrategyError>) -> Self {
        Self {
            id: id.into(),
            accepts,
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times `attempt` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Strategy for MockStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Strategy"
    }

    fn accepts(&self) -> IdentifierKinds {
        self.accepts
    }

    async fn attempt(&self, _identifier: &ArticleIdentifier) -> Result<Attempt, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Helper function to create a candidate for testing.
pub fn make_candidate(url: &str, kind: ArtifactKind, strategy: &str) -> Result<ResolutionCandidate, url::ParseError> {
    Ok(ResolutionCandidate::new(Url::parse(url)?, kind, strategy))
}
