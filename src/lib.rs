//! # pmc-fetch
//!
//! Resolve PubMed Central ids and DOIs to downloadable article files.
//!
//! ## Architecture
//!
//! An identifier is normalized, handed to an ordered chain of resolution
//! strategies, and every candidate URL they produce is fetched and written
//! to disk:
//!
//! - [`models`]: Identifiers, candidates, artifacts and resolution reports
//! - [`strategies`]: The [`Strategy`] trait, the built-in strategies and the chain
//! - [`resolver`]: Drives the chain, fetches and persists candidates
//! - [`eutils`]: NCBI E-utilities search and bibliographic XML fetch
//! - [`utils`]: HTTP client, fetcher, persister and validation
//! - [`config`]: Configuration management

pub mod config;
pub mod eutils;
pub mod models;
pub mod resolver;
pub mod strategies;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{ArticleIdentifier, Resolution, ResolveRequest};
pub use resolver::{ResolveError, Resolver};
pub use strategies::{Strategy, StrategyChain};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
