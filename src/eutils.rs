//! NCBI E-utilities client (esearch and efetch).

use serde::Deserialize;

use crate::utils::HttpClient;

/// Errors from the E-utilities endpoints
#[derive(Debug, thiserror::Error)]
pub enum EutilsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The search matched nothing
    #[error("No records found for '{0}'")]
    NotFound(String),
}

impl From<reqwest::Error> for EutilsError {
    fn from(err: reqwest::Error) -> Self {
        EutilsError::Network(err.to_string())
    }
}

/// Bibliographic XML for a set of PubMed ids
#[derive(Debug, Clone)]
pub struct PubmedExport {
    pub ids: Vec<String>,
    pub xml: String,
}

/// Client for `esearch.fcgi` and `efetch.fcgi`
#[derive(Debug, Clone)]
pub struct EutilsClient {
    client: HttpClient,
    base: String,
}

impl EutilsClient {
    pub fn new(client: HttpClient, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Search a database and return the matching ids, at most `max`
    pub async fn search_ids(&self, db: &str, term: &str, max: usize) -> Result<Vec<String>, EutilsError> {
        let url = format!("{}/esearch.fcgi", self.base);
        let retmax = max.to_string();

        let xml = self
            .get_text(&url, &[("db", db), ("term", term), ("retmax", &retmax)])
            .await?;

        let ids = parse_search_response(&xml)?;
        tracing::debug!(db, term, count = ids.len(), "esearch");
        Ok(ids)
    }

    /// Fetch full records as XML
    pub async fn fetch_xml(&self, db: &str, ids: &[String]) -> Result<String, EutilsError> {
        let url = format!("{}/efetch.fcgi", self.base);
        let id_list = ids.join(",");

        self.get_text(&url, &[("db", db), ("id", &id_list), ("retmode", "xml")])
            .await
    }

    /// PubMed XML for a comma-separated id list, or for the ids a search returns
    pub async fn pubmed_export(&self, query: &str, max: usize) -> Result<PubmedExport, EutilsError> {
        let ids = match parse_id_list(query) {
            Some(ids) => ids,
            None => self.search_ids("pubmed", query, max).await?,
        };

        if ids.is_empty() {
            return Err(EutilsError::NotFound(query.to_string()));
        }

        let xml = self.fetch_xml("pubmed", &ids).await?;
        Ok(PubmedExport { ids, xml })
    }

    async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String, EutilsError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| EutilsError::Network(format!("E-utilities request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EutilsError::Api(format!(
                "E-utilities returned status: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| EutilsError::Network(format!("Failed to read response: {}", e)))
    }
}

/// `12345, 678` -> ids; anything that is not purely numeric ids -> `None`
fn parse_id_list(query: &str) -> Option<Vec<String>> {
    let ids: Vec<String> = query
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    (!ids.is_empty() && ids.iter().all(|id| id.chars().all(|c| c.is_ascii_digit()))).then_some(ids)
}

fn parse_search_response(xml: &str) -> Result<Vec<String>, EutilsError> {
    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct ESearchResult {
        #[serde(default)]
        IdList: Option<IdList>,
    }

    #[derive(Debug, Deserialize)]
    struct IdList {
        #[serde(rename = "Id", default)]
        ids: Vec<String>,
    }

    let result: ESearchResult = quick_xml::de::from_str(xml)
        .map_err(|e| EutilsError::Parse(format!("Failed to parse esearch XML: {}", e)))?;

    Ok(result.IdList.map(|list| list.ids).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESEARCH: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE eSearchResult PUBLIC "-//NLM//DTD esearch 20060628//EN" "https://eutils.ncbi.nlm.nih.gov/eutils/dtd/20060628/esearch.dtd">
<eSearchResult><Count>2</Count><RetMax>2</RetMax><RetStart>0</RetStart>
<IdList><Id>5334499</Id><Id>4123456</Id></IdList>
<TranslationSet/></eSearchResult>"#;

    #[test]
    fn test_parse_search_response() {
        assert_eq!(parse_search_response(ESEARCH).unwrap(), vec!["5334499", "4123456"]);

        let empty = "<eSearchResult><Count>0</Count><IdList/></eSearchResult>";
        assert!(parse_search_response(empty).unwrap().is_empty());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1, 22,333").unwrap(), vec!["1", "22", "333"]);
        assert!(parse_id_list("breast cancer").is_none());
        assert!(parse_id_list("12, abc").is_none());
        assert!(parse_id_list(" , ").is_none());
    }

    #[tokio::test]
    async fn test_pubmed_export_searches_then_fetches() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("db".into(), "pubmed".into()),
                mockito::Matcher::UrlEncoded("term".into(), "BRCA1".into()),
                mockito::Matcher::UrlEncoded("retmax".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(ESEARCH)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("id".into(), "5334499,4123456".into()),
                mockito::Matcher::UrlEncoded("retmode".into(), "xml".into()),
            ]))
            .with_status(200)
            .with_body("<PubmedArticleSet/>")
            .create_async()
            .await;

        let client = EutilsClient::new(HttpClient::new().unwrap(), &server.url());
        let export = client.pubmed_export("BRCA1", 5).await.unwrap();

        assert_eq!(export.ids.len(), 2);
        assert_eq!(export.xml, "<PubmedArticleSet/>");
        search.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_pubmed_export_empty_search() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<eSearchResult><Count>0</Count><IdList></IdList></eSearchResult>")
            .create_async()
            .await;

        let client = EutilsClient::new(HttpClient::new().unwrap(), &server.url());
        let err = client.pubmed_export("nothing matches", 5).await.unwrap_err();
        assert!(matches!(err, EutilsError::NotFound(_)));
    }
}
