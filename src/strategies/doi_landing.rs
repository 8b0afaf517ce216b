//! DOI landing page strategy.
//!
//! Follows a DOI through the resolver to the publisher's landing page and
//! picks the PDF link out of it: the `citation_pdf_url` meta tag when the
//! publisher provides one, otherwise the first link to a `.pdf` path.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use super::{Strategy, StrategyError};
use crate::models::{
    ArticleIdentifier, ArtifactKind, Attempt, IdentifierKind, IdentifierKinds, ResolutionCandidate,
};
use crate::utils::validate::{rebase_url, validate_doi};
use crate::utils::HttpClient;

const STRATEGY_ID: &str = "doi_landing";

/// Resolves DOIs to a PDF link on the publisher landing page
#[derive(Debug, Clone)]
pub struct DoiLandingStrategy {
    client: HttpClient,
    resolver: String,
}

impl DoiLandingStrategy {
    pub fn new(client: HttpClient, resolver: &str) -> Result<Self, StrategyError> {
        Url::parse(resolver)?;
        Ok(Self {
            client,
            resolver: resolver.trim_end_matches('/').to_string(),
        })
    }

    /// Landing page URLs to try, in order
    fn landing_urls(&self, identifier: &ArticleIdentifier) -> Result<Vec<Url>, StrategyError> {
        let value = identifier.value();
        let lower = value.to_ascii_lowercase();

        // Resolver URLs for a DOI go through the DOI handling below
        if (lower.starts_with("http://") || lower.starts_with("https://"))
            && validate_doi(value).is_err()
        {
            let url = Url::parse(value)
                .map_err(|e| StrategyError::InvalidRequest(format!("'{}': {}", value, e)))?;
            return Ok(vec![url]);
        }

        let doi = validate_doi(value)
            .map_err(|e| StrategyError::InvalidRequest(e.to_string()))?;

        Ok(doi_paths(&doi)
            .iter()
            .filter_map(|path| Url::parse(&format!("{}/{}", self.resolver, path)).ok())
            .collect())
    }

    /// Fetch one landing page and look for a PDF link on it
    async fn try_landing(&self, landing: &Url) -> Result<Option<Url>, StrategyError> {
        let response = self
            .client
            .get(landing.as_str())
            .send()
            .await
            .map_err(|e| StrategyError::Network(format!("DOI request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StrategyError::Api(format!(
                "{} returned status: {}",
                landing,
                response.status()
            )));
        }

        let page_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| StrategyError::Network(format!("Failed to read landing page: {}", e)))?;

        extract_pdf_link(&html, &page_url)
    }
}

#[async_trait]
impl Strategy for DoiLandingStrategy {
    fn id(&self) -> &str {
        STRATEGY_ID
    }

    fn name(&self) -> &str {
        "DOI Landing Page"
    }

    fn accepts(&self) -> IdentifierKinds {
        IdentifierKinds::DOI
    }

    async fn attempt(&self, identifier: &ArticleIdentifier) -> Result<Attempt, StrategyError> {
        if identifier.kind() != IdentifierKind::Doi {
            return Err(StrategyError::InvalidRequest(format!(
                "'{}' is not a DOI",
                identifier
            )));
        }

        let mut last_failure: Option<StrategyError> = None;

        for landing in self.landing_urls(identifier)? {
            tracing::debug!(%landing, "trying DOI landing page");

            match self.try_landing(&landing).await {
                Ok(Some(url)) => {
                    let candidate = ResolutionCandidate::new(url, ArtifactKind::Pdf, STRATEGY_ID);
                    return Ok(Attempt::found(vec![candidate]));
                }
                Ok(None) => {
                    last_failure = None;
                    tracing::debug!(%landing, "no PDF link on landing page");
                }
                Err(e) if e.is_soft() => {
                    tracing::debug!(%landing, error = %e, "landing page failed");
                    last_failure = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_failure {
            Some(e) => Err(e),
            None => Ok(Attempt::not_found(format!(
                "no PDF link on landing page for {}",
                identifier
            ))),
        }
    }
}

/// Resolver paths for a DOI: prefix and last segment first, then the full DOI
/// when the suffix itself contains a `/`
fn doi_paths(doi: &str) -> Vec<String> {
    let mut paths = Vec::new();

    if let (Some((prefix, _)), Some((_, last))) = (doi.split_once('/'), doi.rsplit_once('/')) {
        paths.push(format!("{}/{}", prefix, last));
    }

    if doi.matches('/').count() > 1 {
        paths.push(doi.to_string());
    }

    paths
}

/// Find the PDF link on a landing page
fn extract_pdf_link(html: &str, page_url: &Url) -> Result<Option<Url>, StrategyError> {
    let meta = Selector::parse(r#"meta[name="citation_pdf_url"]"#)
        .map_err(|e| StrategyError::Parse(format!("selector: {}", e)))?;
    let links = Selector::parse("[href]")
        .map_err(|e| StrategyError::Parse(format!("selector: {}", e)))?;

    let document = Html::parse_document(html);

    let from_meta = document
        .select(&meta)
        .filter_map(|el| el.value().attr("content"))
        .find_map(|content| rebase_url(content, page_url).ok());

    if from_meta.is_some() {
        return Ok(from_meta);
    }

    Ok(document
        .select(&links)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| rebase_url(href, page_url).ok())
        .find(|url| url.path().to_ascii_lowercase().ends_with(".pdf")))
}
