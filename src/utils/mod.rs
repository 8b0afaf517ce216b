//! Utility modules supporting resolution.
//!
//! - [`HttpClient`]: shared reqwest client built from the `[http]` config
//! - [`Fetcher`]: downloads a candidate URL into a [`FetchResult`](crate::models::FetchResult)
//! - [`Persister`]: writes fetched bytes into the output directory
//! - [`validate`]: identifier, DOI and file-name validation, URL rebasing
//!
//! # Fetch and persist
//!
//! ```rust,no_run
//! use pmc_fetch::models::ArtifactKind;
//! use pmc_fetch::utils::{Fetcher, HttpClient, Persister};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(HttpClient::new()?, 100 * 1024 * 1024);
//! let url = url::Url::parse("https://example.org/article.pdf")?;
//! let result = fetcher.fetch(&url).await;
//! if result.success {
//!     Persister::new("./articles").persist(&result.bytes, "article.pdf", ArtifactKind::Pdf, "manual")?;
//! }
//! # Ok(())
//! # }
//! ```

mod fetch;
mod http;
mod persist;
pub mod validate;

pub use fetch::Fetcher;
pub use http::HttpClient;
pub use persist::{PersistError, Persister};
