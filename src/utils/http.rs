//! HTTP client utilities.

use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;

/// Redirect hops followed before a request is abandoned
const MAX_REDIRECTS: usize = 10;

/// Shared HTTP client configured from [`HttpConfig`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a client honoring the configured timeouts and user agent
    pub fn from_config(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn head(&self, url: &str) -> RequestBuilder {
        self.client.head(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_config() {
        let config = HttpConfig {
            timeout_secs: 1,
            connect_timeout_secs: 1,
            user_agent: "pmc-fetch-test".to_string(),
        };
        assert!(HttpClient::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_user_agent_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ua")
            .match_header("user-agent", "pmc-fetch-test")
            .with_status(200)
            .create_async()
            .await;

        let config = HttpConfig {
            user_agent: "pmc-fetch-test".to_string(),
            ..HttpConfig::default()
        };
        let client = HttpClient::from_config(&config).unwrap();
        let response = client
            .get(&format!("{}/ua", server.url()))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        mock.assert_async().await;
    }
}
