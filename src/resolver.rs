//! The article resolver: normalize, run the strategy chain, fetch, persist.
//!
//! ```rust,no_run
//! use pmc_fetch::config::Config;
//! use pmc_fetch::models::ResolveRequest;
//! use pmc_fetch::Resolver;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = Resolver::from_config(&Config::default())?;
//! let resolution = resolver.resolve(&ResolveRequest::new("PMC5334499")).await?;
//! for artifact in &resolution.artifacts {
//!     println!("{} ({} bytes)", artifact.path.display(), artifact.bytes);
//! }
//! # Ok(())
//! # }
//! ```

use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use url::Url;

use crate::config::Config;
use crate::models::{
    ArticleIdentifier, Attempt, BatchEntry, BatchReport, IdentifierKind, Resolution,
    ResolutionMode, ResolveRequest, StrategyReport,
};
use crate::strategies::{StrategyChain, StrategyError};
use crate::utils::validate::{sanitize_filename, ValidationError};
use crate::utils::{Fetcher, HttpClient, PersistError, Persister};

/// Errors that end a single resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Rejected before any network call
    #[error("{0}")]
    InvalidIdentifier(#[from] ValidationError),

    /// Every strategy ran and none produced an artifact
    #[error("No downloadable article found for {0}")]
    NotFound(String),

    /// Nothing was written and at least one strategy or fetch failed softly
    #[error("Could not fetch {identifier}: {message}")]
    TransientFetch { identifier: String, message: String },

    /// Writing an artifact failed; never retried
    #[error("Failed to save artifact: {0}")]
    Io(#[from] PersistError),

    /// A strategy failed in a way falling through cannot fix
    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Bookkeeping shared by the primary and fallback runs of one resolution
#[derive(Debug, Default)]
struct RunState {
    fetched: HashSet<Url>,
    last_failure: Option<String>,
}

/// Resolves identifiers to artifacts on disk
#[derive(Debug, Clone)]
pub struct Resolver {
    chain: StrategyChain,
    fetcher: Fetcher,
    persister: Persister,
    mode: ResolutionMode,
}

impl Resolver {
    pub fn new(
        chain: StrategyChain,
        fetcher: Fetcher,
        persister: Persister,
        mode: ResolutionMode,
    ) -> Self {
        Self {
            chain,
            fetcher,
            persister,
            mode,
        }
    }

    /// Build the HTTP client, strategy chain, fetcher and persister from config
    pub fn from_config(config: &Config) -> Result<Self, ResolveError> {
        let client = HttpClient::from_config(&config.http)?;
        let chain = StrategyChain::from_config(config, &client)?;
        let fetcher = Fetcher::new(client, config.downloads.max_file_size_bytes());
        let persister = Persister::new(&config.downloads.output_dir);

        Ok(Self::new(chain, fetcher, persister, config.resolution.mode))
    }

    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resolve one identifier and write its artifacts
    #[tracing::instrument(skip(self, request), fields(identifier = %request.identifier))]
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        let identifier = ArticleIdentifier::parse(&request.identifier)?;
        if let Some(name) = &request.file_name {
            sanitize_filename(name).map_err(PersistError::from)?;
        }

        let mode = if request.file_name.is_some() {
            ResolutionMode::FirstSuccess
        } else {
            self.mode
        };

        let stem = identifier.file_stem();
        let mut resolution = Resolution::new(identifier.clone());
        let mut state = RunState::default();

        self.run_chain(&identifier, &stem, request, mode, &mut resolution, &mut state)
            .await?;

        // The DOI fallback runs until a PDF is written, even after an archive
        if !resolution.has_pdf() {
            if let Some(doi) = &request.fallback_doi {
                let fallback = ArticleIdentifier::parse(doi)?;
                if fallback.kind() == IdentifierKind::Doi {
                    tracing::info!(doi = %fallback, "no PDF yet, falling back to DOI");
                    self.run_chain(&fallback, &stem, request, mode, &mut resolution, &mut state)
                        .await?;
                } else {
                    tracing::warn!(value = %doi, "fallback is not a DOI, ignoring");
                }
            }
        }

        if resolution.artifacts.is_empty() {
            return Err(match state.last_failure {
                Some(message) => ResolveError::TransientFetch {
                    identifier: identifier.to_string(),
                    message,
                },
                None => ResolveError::NotFound(identifier.to_string()),
            });
        }

        tracing::info!(
            artifacts = resolution.artifacts.len(),
            bytes = resolution.total_bytes(),
            "resolved"
        );
        Ok(resolution)
    }

    /// Run every applicable strategy for `identifier`, fetching and writing
    /// candidates as they come. Stops early in first-success mode.
    async fn run_chain(
        &self,
        identifier: &ArticleIdentifier,
        stem: &str,
        request: &ResolveRequest,
        mode: ResolutionMode,
        resolution: &mut Resolution,
        state: &mut RunState,
    ) -> Result<(), ResolveError> {
        let strategies = self.chain.strategies_for(identifier);
        if strategies.is_empty() {
            tracing::info!(kind = %identifier.kind(), "no strategy accepts this identifier");
        }

        for strategy in strategies {
            let report = self.chain.attempt(strategy.as_ref(), identifier).await?;

            if let Attempt::SoftFailure { reason } = &report.attempt {
                state.last_failure = Some(reason.clone());
            }

            let done = self
                .fetch_candidates(&report, stem, request, mode, resolution, state)
                .await?;
            resolution.reports.push(report);

            if done {
                break;
            }
        }

        Ok(())
    }

    /// Fetch and persist a report's candidates. Returns whether resolution is complete.
    async fn fetch_candidates(
        &self,
        report: &StrategyReport,
        stem: &str,
        request: &ResolveRequest,
        mode: ResolutionMode,
        resolution: &mut Resolution,
        state: &mut RunState,
    ) -> Result<bool, ResolveError> {
        for candidate in report.attempt.candidates() {
            if !state.fetched.insert(candidate.url.clone()) {
                tracing::debug!(url = %candidate.url, "already fetched, skipping");
                continue;
            }

            let result = self.fetcher.fetch(&candidate.url).await;
            if !result.success {
                let message = result.message.unwrap_or_else(|| "fetch failed".to_string());
                tracing::warn!(
                    strategy = %candidate.strategy,
                    url = %candidate.url,
                    %message,
                    "fetch failed, trying next candidate"
                );
                state.last_failure = Some(message);
                continue;
            }

            let file_name = match &request.file_name {
                Some(name) => name.clone(),
                None => candidate.file_name(stem),
            };

            let artifact = self.persister.persist(
                &result.bytes,
                &file_name,
                candidate.kind,
                &candidate.strategy,
            )?;
            resolution.artifacts.push(artifact);

            if mode == ResolutionMode::FirstSuccess {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Run the strategy chain only, without fetching or writing anything
    pub async fn dry_run(&self, raw: &str) -> Result<Vec<StrategyReport>, ResolveError> {
        let identifier = ArticleIdentifier::parse(raw)?;
        Ok(self.chain.resolve_candidates(&identifier).await?)
    }

    /// Resolve many identifiers through a bounded, ordered worker pool.
    ///
    /// Failures are recorded per identifier and never abort the batch.
    /// `on_entry` is called as each identifier finishes, in input order.
    pub async fn resolve_batch<F>(&self, ids: Vec<String>, jobs: usize, mut on_entry: F) -> BatchReport
    where
        F: FnMut(&BatchEntry),
    {
        let mut report = BatchReport::default();

        let mut results = stream::iter(ids)
            .map(|id| async move {
                let result = self.resolve(&ResolveRequest::new(id.as_str())).await;
                (id, result)
            })
            .buffered(jobs.max(1));

        while let Some((identifier, result)) = results.next().await {
            let entry = match result {
                Ok(resolution) => BatchEntry {
                    identifier,
                    artifacts: resolution.artifacts,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(%identifier, error = %e, "resolution failed");
                    BatchEntry {
                        identifier,
                        artifacts: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };

            on_entry(&entry);
            report.push(entry);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactKind, IdentifierKinds};
    use crate::strategies::mock::{make_candidate, MockStrategy};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn resolver_with(
        strategies: Vec<Arc<MockStrategy>>,
        output_dir: &std::path::Path,
        mode: ResolutionMode,
    ) -> Resolver {
        let mut chain = StrategyChain::new();
        for strategy in strategies {
            chain.register(strategy);
        }
        let fetcher = Fetcher::new(HttpClient::new().unwrap(), 1024 * 1024);
        Resolver::new(chain, fetcher, Persister::new(output_dir), mode)
    }

    #[tokio::test]
    async fn test_empty_identifier_makes_no_call() {
        let dir = tempdir().unwrap();
        let strategy = Arc::new(MockStrategy::new(
            "mock",
            IdentifierKinds::all(),
            Ok(Attempt::not_found("x")),
        ));
        let resolver = resolver_with(vec![strategy.clone()], dir.path(), ResolutionMode::CollectAll);

        for raw in ["", "   ", "PMC"] {
            let err = resolver.resolve(&ResolveRequest::new(raw)).await.unwrap_err();
            assert!(matches!(err, ResolveError::InvalidIdentifier(_)), "input {:?}", raw);
        }
        assert_eq!(strategy.calls(), 0);
    }

    #[tokio::test]
    async fn test_not_found_when_every_strategy_has_nothing() {
        let dir = tempdir().unwrap();
        let first = Arc::new(MockStrategy::new("a", IdentifierKinds::PMC, Ok(Attempt::not_found("none"))));
        let second = Arc::new(MockStrategy::new("b", IdentifierKinds::PMC, Ok(Attempt::not_found("none"))));
        let resolver = resolver_with(vec![first.clone(), second.clone()], dir.path(), ResolutionMode::CollectAll);

        let err = resolver.resolve(&ResolveRequest::new("PMC1")).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_soft_failure_reported_as_transient() {
        let dir = tempdir().unwrap();
        let flaky = Arc::new(MockStrategy::new(
            "flaky",
            IdentifierKinds::PMC,
            Err(StrategyError::Api("HTTP 503".into())),
        ));
        let resolver = resolver_with(vec![flaky], dir.path(), ResolutionMode::CollectAll);

        let err = resolver.resolve(&ResolveRequest::new("42")).await.unwrap_err();
        match err {
            ResolveError::TransientFetch { identifier, message } => {
                assert_eq!(identifier, "PMC42");
                assert!(message.contains("503"));
            }
            other => panic!("expected TransientFetch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hard_strategy_error_aborts() {
        let dir = tempdir().unwrap();
        let broken = Arc::new(MockStrategy::new(
            "broken",
            IdentifierKinds::PMC,
            Err(StrategyError::InvalidRequest("nope".into())),
        ));
        let resolver = resolver_with(vec![broken], dir.path(), ResolutionMode::CollectAll);

        let err = resolver.resolve(&ResolveRequest::new("42")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Strategy(_)));
    }

    #[tokio::test]
    async fn test_collect_all_dedups_and_first_success_stops() {
        let mut server = mockito::Server::new_async().await;
        let pdf = server
            .mock("GET", "/a.pdf")
            .with_status(200)
            .with_body("pdf")
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/a.tar.gz")
            .with_status(200)
            .with_body("tgz")
            .create_async()
            .await;

        let archive = make_candidate(&format!("{}/a.tar.gz", server.url()), ArtifactKind::Archive, "one").unwrap();
        let same_pdf = make_candidate(&format!("{}/a.pdf", server.url()), ArtifactKind::Pdf, "one").unwrap();
        let one = Arc::new(MockStrategy::new(
            "one",
            IdentifierKinds::PMC,
            Ok(Attempt::found(vec![archive, same_pdf.clone()])),
        ));
        let two = Arc::new(MockStrategy::new(
            "two",
            IdentifierKinds::PMC,
            Ok(Attempt::found(vec![same_pdf])),
        ));

        let dir = tempdir().unwrap();
        let resolver = resolver_with(vec![one.clone(), two.clone()], dir.path(), ResolutionMode::CollectAll);
        let resolution = resolver.resolve(&ResolveRequest::new("PMC9")).await.unwrap();

        assert_eq!(resolution.artifacts.len(), 2);
        assert!(dir.path().join("9.tar.gz").exists());
        assert!(dir.path().join("9.pdf").exists());
        assert_eq!(resolution.reports.len(), 2);
        pdf.assert_async().await;

        let dir = tempdir().unwrap();
        let resolver = resolver_with(vec![one, two.clone()], dir.path(), ResolutionMode::FirstSuccess);
        let resolution = resolver.resolve(&ResolveRequest::new("PMC9")).await.unwrap();
        assert_eq!(resolution.artifacts.len(), 1);
        assert_eq!(resolution.artifacts[0].kind, ArtifactKind::Archive);
        assert_eq!(two.calls(), 1);
    }

    #[tokio::test]
    async fn test_doi_fallback_named_after_primary() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/paper.pdf")
            .with_status(200)
            .with_body("%PDF")
            .create_async()
            .await;

        let pmc = Arc::new(MockStrategy::new("pmc", IdentifierKinds::PMC, Ok(Attempt::not_found("no"))));
        let doi = Arc::new(MockStrategy::new(
            "doi",
            IdentifierKinds::DOI,
            Ok(Attempt::found(vec![make_candidate(
                &format!("{}/paper.pdf", server.url()),
                ArtifactKind::Pdf,
                "doi",
            )
            .unwrap()])),
        ));

        let dir = tempdir().unwrap();
        let resolver = resolver_with(vec![pmc, doi], dir.path(), ResolutionMode::CollectAll);
        let request = ResolveRequest::new("PMC555").fallback_doi("10.1000/xyz");
        let resolution = resolver.resolve(&request).await.unwrap();

        assert_eq!(resolution.artifacts.len(), 1);
        assert!(resolution.artifacts[0].path.ends_with("555.pdf"));
        assert_eq!(resolution.reports.len(), 2);
    }

    #[tokio::test]
    async fn test_doi_fallback_runs_when_only_archive_written() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pkg.tar.gz")
            .with_status(200)
            .with_body("tgz")
            .create_async()
            .await;
        let pdf = server
            .mock("GET", "/paper.pdf")
            .with_status(200)
            .with_body("%PDF")
            .expect(1)
            .create_async()
            .await;

        let pmc = Arc::new(MockStrategy::new(
            "pmc",
            IdentifierKinds::PMC,
            Ok(Attempt::found(vec![make_candidate(
                &format!("{}/pkg.tar.gz", server.url()),
                ArtifactKind::Archive,
                "pmc",
            )
            .unwrap()])),
        ));
        let doi = Arc::new(MockStrategy::new(
            "doi",
            IdentifierKinds::DOI,
            Ok(Attempt::found(vec![make_candidate(
                &format!("{}/paper.pdf", server.url()),
                ArtifactKind::Pdf,
                "doi",
            )
            .unwrap()])),
        ));

        let dir = tempdir().unwrap();
        let resolver = resolver_with(vec![pmc, doi.clone()], dir.path(), ResolutionMode::CollectAll);
        let request = ResolveRequest::new("PMC2468").fallback_doi("10.1000/closed");
        let resolution = resolver.resolve(&request).await.unwrap();

        assert_eq!(doi.calls(), 1);
        assert!(resolution.has_pdf());
        assert!(dir.path().join("2468.tar.gz").exists());
        assert!(dir.path().join("2468.pdf").exists());
        pdf.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_without_trying_more_candidates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/a.tar.gz")
            .with_status(200)
            .with_body("tgz")
            .create_async()
            .await;
        let second = server
            .mock("GET", "/a.pdf")
            .with_status(200)
            .with_body("pdf")
            .expect(0)
            .create_async()
            .await;

        let strategy = Arc::new(MockStrategy::new(
            "one",
            IdentifierKinds::PMC,
            Ok(Attempt::found(vec![
                make_candidate(&format!("{}/a.tar.gz", server.url()), ArtifactKind::Archive, "one").unwrap(),
                make_candidate(&format!("{}/a.pdf", server.url()), ArtifactKind::Pdf, "one").unwrap(),
            ])),
        ));

        let dir = tempdir().unwrap();
        let not_a_dir = dir.path().join("occupied");
        std::fs::write(&not_a_dir, b"file").unwrap();
        let resolver = resolver_with(vec![strategy], &not_a_dir, ResolutionMode::CollectAll);

        let err = resolver.resolve(&ResolveRequest::new("PMC7")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Io(PersistError::Io { .. })), "got {:?}", err);
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_file_name_with_separator_rejected_before_any_call() {
        let dir = tempdir().unwrap();
        let strategy = Arc::new(MockStrategy::new(
            "mock",
            IdentifierKinds::all(),
            Ok(Attempt::not_found("x")),
        ));
        let resolver = resolver_with(vec![strategy.clone()], dir.path(), ResolutionMode::CollectAll);

        let request = ResolveRequest::new("10.1000/xyz").file_name("out/x.pdf");
        let err = resolver.resolve(&request).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Io(PersistError::InvalidFileName(ValidationError::PathSeparator(_)))
        ));
        assert_eq!(strategy.calls(), 0);
    }

    #[tokio::test]
    async fn test_batch_continues_after_failures() {
        let dir = tempdir().unwrap();
        let strategy = Arc::new(MockStrategy::new("a", IdentifierKinds::PMC, Ok(Attempt::not_found("none"))));
        let resolver = resolver_with(vec![strategy], dir.path(), ResolutionMode::CollectAll);

        let mut seen = Vec::new();
        let report = resolver
            .resolve_batch(vec!["1".into(), "".into(), "3".into()], 2, |entry| {
                seen.push(entry.identifier.clone())
            })
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.failed, 3);
        assert_eq!(seen, vec!["1", "", "3"]);
    }
}
