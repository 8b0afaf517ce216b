//! Byte-level download of resolved candidate URLs.

use url::Url;

use super::http::HttpClient;
use crate::models::FetchResult;

/// Downloads candidate URLs into memory.
///
/// Every failure is reported through [`FetchResult`] rather than an error;
/// the resolver treats a failed fetch as a reason to try the next candidate.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: HttpClient,
    max_bytes: u64,
}

impl Fetcher {
    pub fn new(client: HttpClient, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    pub async fn fetch(&self, url: &Url) -> FetchResult {
        let mut response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return FetchResult::failed(format!("timed out: {}", url)),
            Err(e) => return FetchResult::failed(format!("request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::failed(format!("HTTP {} from {}", status, url));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return FetchResult::failed(format!(
                    "{} bytes exceeds the {} byte limit",
                    length, self.max_bytes
                ));
            }
        }

        // Chunked responses carry no length up front
        let mut bytes = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                        return FetchResult::failed(format!(
                            "body exceeds the {} byte limit",
                            self.max_bytes
                        ));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) if e.is_timeout() => {
                    return FetchResult::failed(format!("timed out reading body: {}", url))
                }
                Err(e) => return FetchResult::failed(format!("failed to read body: {}", e)),
            }
        }

        tracing::debug!(%url, bytes = bytes.len(), "fetched");
        FetchResult::success(bytes)
    }
}
