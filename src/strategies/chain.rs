//! Ordered chain of resolution strategies.

use std::sync::Arc;

use super::{Strategy, StrategyError};
use crate::config::Config;
use crate::models::{ArticleIdentifier, Attempt, StrategyReport};
use crate::utils::HttpClient;

#[cfg(feature = "strategy-doi-landing")]
use super::DoiLandingStrategy;
#[cfg(feature = "strategy-oa-service")]
use super::OaServiceStrategy;
#[cfg(feature = "strategy-pmc-search")]
use super::PmcSearchStrategy;

/// Strategies in priority order
#[derive(Debug, Clone, Default)]
pub struct StrategyChain {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the configured strategies, in configured order
    pub fn from_config(config: &Config, client: &HttpClient) -> Result<Self, StrategyError> {
        let mut chain = Self::new();

        for id in &config.resolution.strategies {
            chain.register(build_strategy(id.trim(), config, client)?);
        }

        if chain.is_empty() {
            return Err(StrategyError::Config("no strategies configured".to_string()));
        }

        Ok(chain)
    }

    /// Append a strategy; one with the same id is replaced in place
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        match self.strategies.iter().position(|s| s.id() == strategy.id()) {
            Some(index) => self.strategies[index] = strategy,
            None => self.strategies.push(strategy),
        }
    }

    /// Get a strategy by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Strategy>> {
        self.strategies.iter().find(|s| s.id() == id)
    }

    /// All strategies, in priority order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Strategy>> {
        self.strategies.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|s| s.id())
    }

    /// Strategies that accept this identifier's kind, in priority order
    pub fn strategies_for(&self, identifier: &ArticleIdentifier) -> Vec<&Arc<dyn Strategy>> {
        self.all().filter(|s| s.supports(identifier)).collect()
    }

    /// Run one strategy, turning soft errors into [`Attempt::SoftFailure`]
    pub async fn attempt(
        &self,
        strategy: &dyn Strategy,
        identifier: &ArticleIdentifier,
    ) -> Result<StrategyReport, StrategyError> {
        tracing::info!(strategy = strategy.id(), %identifier, "trying strategy");

        let attempt = match strategy.attempt(identifier).await {
            Ok(attempt) => attempt,
            Err(e) if e.is_soft() => {
                tracing::warn!(strategy = strategy.id(), error = %e, "strategy failed, falling through");
                Attempt::soft_failure(e.to_string())
            }
            Err(e) => return Err(e),
        };

        match &attempt {
            Attempt::Found { candidates } => {
                tracing::info!(strategy = strategy.id(), count = candidates.len(), "candidates found")
            }
            Attempt::NotFound { reason } => {
                tracing::info!(strategy = strategy.id(), %reason, "nothing found, falling through")
            }
            Attempt::SoftFailure { .. } => {}
        }

        Ok(StrategyReport {
            strategy: strategy.id().to_string(),
            attempt,
        })
    }

    /// Run every applicable strategy without fetching anything
    pub async fn resolve_candidates(
        &self,
        identifier: &ArticleIdentifier,
    ) -> Result<Vec<StrategyReport>, StrategyError> {
        let mut reports = Vec::new();
        for strategy in self.strategies_for(identifier) {
            reports.push(self.attempt(strategy.as_ref(), identifier).await?);
        }
        Ok(reports)
    }

    /// Get the number of strategies
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[allow(unused_variables)]
fn build_strategy(
    id: &str,
    config: &Config,
    client: &HttpClient,
) -> Result<Arc<dyn Strategy>, StrategyError> {
    match id {
        #[cfg(feature = "strategy-oa-service")]
        "oa_service" => Ok(Arc::new(OaServiceStrategy::new(
            client.clone(),
            &config.endpoints.oa_service,
        )?)),
        #[cfg(feature = "strategy-pmc-search")]
        "pmc_search" => Ok(Arc::new(PmcSearchStrategy::new(
            client.clone(),
            &config.endpoints.pmc_search,
        )?)),
        #[cfg(feature = "strategy-doi-landing")]
        "doi_landing" => Ok(Arc::new(DoiLandingStrategy::new(
            client.clone(),
            &config.endpoints.doi_resolver,
        )?)),
        other => Err(StrategyError::Config(format!(
            "unknown or disabled strategy '{}'",
            other
        ))),
    }
}
