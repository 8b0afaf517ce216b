//! PMC open-access service strategy.
//!
//! Queries the OA web service (`oa.fcgi?id=PMC…`), which answers with the
//! package and PDF links of open-access articles.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{Strategy, StrategyError};
use crate::models::{ArticleIdentifier, ArtifactKind, Attempt, IdentifierKinds, ResolutionCandidate};
use crate::utils::validate::rebase_url;
use crate::utils::HttpClient;

const STRATEGY_ID: &str = "oa_service";

/// Structured-API strategy backed by the PMC OA service
#[derive(Debug, Clone)]
pub struct OaServiceStrategy {
    client: HttpClient,
    endpoint: Url,
}

impl OaServiceStrategy {
    pub fn new(client: HttpClient, endpoint: &str) -> Result<Self, StrategyError> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }

    /// Turn a parsed response into an attempt, archives first
    fn candidates(&self, response: OaResponse) -> Attempt {
        if let Some(error) = response.error {
            return Attempt::not_found(format!("{}: {}", error.code, error.message.trim()));
        }

        let mut candidates: Vec<ResolutionCandidate> = response
            .records
            .into_iter()
            .flat_map(|records| records.records)
            .flat_map(|record| record.links)
            .filter_map(|link| {
                let kind = ArtifactKind::from_format(&link.format)?;
                match self.link_url(&link.href) {
                    Ok(url) => Some(ResolutionCandidate::new(url, kind, STRATEGY_ID)),
                    Err(e) => {
                        tracing::debug!(href = %link.href, error = %e, "skipping OA link");
                        None
                    }
                }
            })
            .collect();

        candidates.sort_by_key(|c| c.kind.preference());
        Attempt::found(candidates)
    }

    fn link_url(&self, href: &str) -> Result<Url, StrategyError> {
        let mut url =
            rebase_url(href, &self.endpoint).map_err(|e| StrategyError::Parse(e.to_string()))?;

        // The same tree is served over HTTPS; the client has no FTP support
        if url.scheme() == "ftp" {
            url.set_scheme("https")
                .map_err(|_| StrategyError::Parse(format!("cannot rewrite {}", href)))?;
        }

        Ok(url)
    }
}

#[async_trait]
impl Strategy for OaServiceStrategy {
    fn id(&self) -> &str {
        STRATEGY_ID
    }

    fn name(&self) -> &str {
        "PMC OA Service"
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
            .query(&[("id", pmcid.as_str())])
            .send()
            .await
            .map_err(|e| StrategyError::Network(format!("OA service request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StrategyError::Api(format!(
                "OA service returned status: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StrategyError::Network(format!("Failed to read OA response: {}", e)))?;

        let parsed: OaResponse = quick_xml::de::from_str(&body)?;
        Ok(self.candidates(parsed))
    }
}

// ===== OA Service XML Types =====

#[derive(Debug, Deserialize)]
#[serde(rename = "OA")]
struct OaResponse {
    #[serde(rename = "error")]
    error: Option<OaError>,

    #[serde(rename = "records")]
    records: Option<OaRecords>,
}

#[derive(Debug, Deserialize)]
struct OaError {
    #[serde(rename = "@code", default)]
    code: String,

    #[serde(rename = "$text", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OaRecords {
    #[serde(rename = "record", default)]
    records: Vec<OaRecord>,
}

#[derive(Debug, Deserialize)]
struct OaRecord {
    #[serde(rename = "link", default)]
    links: Vec<OaLink>,
}

#[derive(Debug, Deserialize)]
struct OaLink {
    #[serde(rename = "@format", default)]
    format: String,

    #[serde(rename = "@href")]
    href: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LINKS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OA><responseDate>2024-01-01 00:00:00</responseDate>
<request id="PMC5334499">https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi?id=PMC5334499</request>
<records returned-count="1" total-count="1">
<record id="PMC5334499" citation="Sci Rep. 2017" license="CC BY" retracted="no">
<link format="pdf" updated="2017-03-03" href="ftp://ftp.ncbi.nlm.nih.gov/pub/pmc/oa_pdf/a1/b2/srep43.PMC5334499.pdf" />
<link format="tgz" updated="2017-03-03" href="ftp://ftp.ncbi.nlm.nih.gov/pub/pmc/oa_package/a1/b2/PMC5334499.tar.gz" />
</record>
</records>
</OA>"#;

    fn strategy(endpoint: &str) -> OaServiceStrategy {
        OaServiceStrategy::new(HttpClient::new().unwrap(), endpoint).unwrap()
    }

    #[test]
    fn test_archive_ordered_before_pdf() {
        let parsed: OaResponse = quick_xml::de::from_str(TWO_LINKS).unwrap();
        let attempt = strategy("https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi").candidates(parsed);

        let candidates = attempt.candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].kind, ArtifactKind::Archive);
        assert_eq!(candidates[1].kind, ArtifactKind::Pdf);
        assert_eq!(
            candidates[0].url.as_str(),
            "https://ftp.ncbi.nlm.nih.gov/pub/pmc/oa_package/a1/b2/PMC5334499.tar.gz"
        );
        assert!(candidates.iter().all(|c| c.strategy == STRATEGY_ID));
    }

    #[test]
    fn test_error_element_is_not_found() {
        let xml = r#"<OA><responseDate>2024-01-01</responseDate>
<request id="PMC1234567">https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi?id=PMC1234567</request>
<error code="idIsNotOpenAccess">identifier 'PMC1234567' is not Open Access</error></OA>"#;
        let parsed: OaResponse = quick_xml::de::from_str(xml).unwrap();
        let attempt = strategy("https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi").candidates(parsed);

        match attempt {
            Attempt::NotFound { reason } => assert!(reason.starts_with("idIsNotOpenAccess")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_formats_ignored() {
        let xml = r#"<OA><records><record id="PMC1"><link format="xml" href="https://x.org/a.xml" /></record></records></OA>"#;
        let parsed: OaResponse = quick_xml::de::from_str(xml).unwrap();
        let attempt = strategy("https://x.org/oa.fcgi").candidates(parsed);
        assert!(matches!(attempt, Attempt::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_attempt_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"<OA><records><record id="PMC42"><link format="tgz" href="/pub/pmc/PMC42.tar.gz" /></record></records></OA>"#;
        let mock = server
            .mock("GET", "/oa.fcgi")
            .match_query(mockito::Matcher::UrlEncoded("id".into(), "PMC42".into()))
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(body)
            .create_async()
            .await;

        let strategy = strategy(&format!("{}/oa.fcgi", server.url()));
        let id = ArticleIdentifier::parse("PMC42").unwrap();
        let attempt = strategy.attempt(&id).await.unwrap();

        let candidates = attempt.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].url.as_str(),
            format!("{}/pub/pmc/PMC42.tar.gz", server.url())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_soft() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/oa.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let strategy = strategy(&format!("{}/oa.fcgi", server.url()));
        let id = ArticleIdentifier::parse("42").unwrap();
        let err = strategy.attempt(&id).await.unwrap_err();
        assert!(err.is_soft());
    }

    #[tokio::test]
    async fn test_rejects_doi() {
        let strategy = strategy("http://127.0.0.1:1/oa.fcgi");
        let id = ArticleIdentifier::parse("10.1000/xyz").unwrap();
        assert!(!strategy.supports(&id));
        let err = strategy.attempt(&id).await.unwrap_err();
        assert!(!err.is_soft());
    }
}
