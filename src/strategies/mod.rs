//! Resolution strategies with an extensible trait-based architecture.
//!
//! A [`Strategy`] turns an [`ArticleIdentifier`] into download candidates.
//! Strategies are tried in priority order by a [`StrategyChain`]; each
//! one either finds candidates, reports that it has nothing, or fails softly
//! so the next one gets its turn.
//!
//! # Feature Flags
//!
//! Individual strategies can be disabled at compile time using Cargo features:
//!
//! - `oa-service` - PMC open-access service lookup (default: enabled)
//! - `pmc-search` - PMC search page scraping (default: enabled)
//! - `doi-landing` - DOI landing page scraping (default: enabled)
//!
//! # Runtime Configuration
//!
//! The order and selection of strategies comes from `resolution.strategies`
//! in the config file, or from the environment:
//!
//! ```bash
//! export PMC_FETCH_RESOLUTION__STRATEGIES="pmc_search,oa_service"
//! ```
//!
//! Naming a strategy that was not compiled in is a configuration error.

mod chain;
#[cfg(feature = "strategy-doi-landing")]
mod doi_landing;
pub mod mock;
#[cfg(feature = "strategy-oa-service")]
mod oa_service;
#[cfg(feature = "strategy-pmc-search")]
mod pmc_search;

pub use chain::StrategyChain;
#[cfg(feature = "strategy-doi-landing")]
pub use doi_landing::DoiLandingStrategy;
pub use mock::MockStrategy;
#[cfg(feature = "strategy-oa-service")]
pub use oa_service::OaServiceStrategy;
#[cfg(feature = "strategy-pmc-search")]
pub use pmc_search::PmcSearchStrategy;

use async_trait::async_trait;

use crate::models::{ArticleIdentifier, Attempt, IdentifierKinds};

/// Interface for every resolution strategy.
///
/// # Implementing a New Strategy
///
/// 1. Create a struct holding its [`HttpClient`](crate::utils::HttpClient) and endpoint
/// 2. Implement `id`, `name`, `accepts` and `attempt`
/// 3. Return [`Attempt::NotFound`] when the upstream simply has nothing; return
///    a soft [`StrategyError`] when the upstream could not be queried
/// 4. Add it to [`StrategyChain::from_config`] behind its own feature
#[async_trait]
pub trait Strategy: Send + Sync + std::fmt::Debug {
    /// Stable identifier used in configuration and reports (e.g. "oa_service")
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Identifier kinds this strategy can resolve
    fn accepts(&self) -> IdentifierKinds;

    /// Whether this strategy applies to the given identifier
    fn supports(&self, identifier: &ArticleIdentifier) -> bool {
        self.accepts().contains(identifier.kind().as_flag())
    }

    /// Look up download candidates for an identifier
    async fn attempt(&self, identifier: &ArticleIdentifier) -> Result<Attempt, StrategyError>;
}

/// Errors that can occur while running a strategy
#[derive(Debug, Clone, thiserror::Error)]
pub enum StrategyError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with an unusable status
    #[error("API error: {0}")]
    Api(String),

    /// Parsing error (XML, HTML, URL)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The identifier cannot be handled by this strategy
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Strategy misconfigured or not available
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Error: {0}")]
    Other(String),
}

impl StrategyError {
    /// Soft errors fall through to the next strategy; hard ones abort the resolution
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            StrategyError::Network(_) | StrategyError::Api(_) | StrategyError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for StrategyError {
    fn from(err: reqwest::Error) -> Self {
        StrategyError::Network(err.to_string())
    }
}

impl From<quick_xml::DeError> for StrategyError {
    fn from(err: quick_xml::DeError) -> Self {
        StrategyError::Parse(format!("XML: {}", err))
    }
}

impl From<url::ParseError> for StrategyError {
    fn from(err: url::ParseError) -> Self {
        StrategyError::Config(format!("URL: {}", err))
    }
}
