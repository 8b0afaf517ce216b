//! PMC search page scraping strategy.
//!
//! Searches the PMC web UI for `PMC{id}`, collects links to the article's
//! PDF rendition and keeps the first one the server actually serves as a PDF.

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::{Strategy, StrategyError};
use crate::models::{ArticleIdentifier, ArtifactKind, Attempt, IdentifierKinds, ResolutionCandidate};
use crate::utils::validate::rebase_url;
use crate::utils::HttpClient;

const STRATEGY_ID: &str = "pmc_search";

/// Scrapes the PMC search results page for a PDF link
#[derive(Debug, Clone)]
pub struct PmcSearchStrategy {
    client: HttpClient,
    endpoint: Url,
}

impl PmcSearchStrategy {
    pub fn new(client: HttpClient, endpoint: &str) -> Result<Self, StrategyError> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }

    /// Check that a link is served as a PDF
    async fn is_pdf(&self, url: &Url) -> bool {
        match self.client.head(url.as_str()).send().await {
            Ok(response) if response.status().is_success() => response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.trim().to_ascii_lowercase().starts_with("application/pdf")),
            Ok(response) => {
                tracing::debug!(%url, status = %response.status(), "HEAD rejected PDF link");
                false
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "HEAD failed for PDF link");
                false
            }
        }
    }
}

#[async_trait]
impl Strategy for PmcSearchStrategy {
    fn id(&self) -> &str {
        STRATEGY_ID
    }

    fn name(&self) -> &str {
        "PMC Search"
    }

    fn accepts(&self) -> IdentifierKinds {
        IdentifierKinds::PMC
    }

    async fn attempt(&self, identifier: &ArticleIdentifier) -> Result<Attempt, StrategyError> {
        let pmcid = identifier.pmcid().ok_or_else(|| {
            StrategyError::InvalidRequest(format!("'{}' is not a PMC id", identifier))
        })?;

        let response = self
            .client
            .get(self.endpoint.as_str())
            .query(&[("term", pmcid.as_str())])
            .send()
            .await
            .map_err(|e| StrategyError::Network(format!("PMC search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StrategyError::Api(format!(
                "PMC search returned status: {}",
                response.status()
            )));
        }

        // Links are rebased against wherever the search redirected to
        let page_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| StrategyError::Network(format!("Failed to read search page: {}", e)))?;

        let links = extract_pdf_links(&html, &pmcid, &page_url)?;
        if links.is_empty() {
            return Ok(Attempt::not_found(format!("no PDF link for {} on search page", pmcid)));
        }

        tracing::debug!(count = links.len(), "PDF links on search page");

        for url in links {
            if self.is_pdf(&url).await {
                let candidate =
                    ResolutionCandidate::new(url, ArtifactKind::Pdf, STRATEGY_ID).file_stem(pmcid);
                return Ok(Attempt::found(vec![candidate]));
            }
        }

        Ok(Attempt::not_found(format!("no PDF link for {} served a PDF", pmcid)))
    }
}

/// Distinct absolute links to `PMC{id}`'s PDF rendition, in document order
fn extract_pdf_links(html: &str, pmcid: &str, page_url: &Url) -> Result<Vec<Url>, StrategyError> {
    let pattern = Regex::new(&format!(
        r"(?i)^(?:(?:https?:)?//[^/]+)?(?:/pmc)?/articles/{}/pdf/[^?#]*\.pdf",
        regex::escape(pmcid)
    ))
    .map_err(|e| StrategyError::Other(format!("PDF link pattern: {}", e)))?;

    let anchors = Selector::parse("a[href]")
        .map_err(|e| StrategyError::Parse(format!("selector: {}", e)))?;

    let document = Html::parse_document(html);
    let mut links: Vec<Url> = Vec::new();

    for href in document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| pattern.is_match(href))
    {
        match rebase_url(href, page_url) {
            Ok(url) if !links.contains(&url) => links.push(url),
            Ok(_) => {}
            Err(e) => tracing::debug!(href, error = %e, "skipping unrebasable link"),
        }
    }

    Ok(links)
}
