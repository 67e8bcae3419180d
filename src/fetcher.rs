//! Article page retrieval.
//!
//! Every outgoing request carries the configured client identifier and a
//! bounded timeout. A failed fetch is a value ([`PageResult::Failed`]), not
//! an error that could abort the run: the orchestrator logs it and moves on
//! to the next candidate.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::FetchError;

/// Outcome of fetching one article page.
#[derive(Debug)]
pub enum PageResult {
    /// The page body as text.
    Ok(String),
    /// Transport failure, timeout, non-success status or unreadable body.
    Failed(FetchError),
}

/// Anything that can produce article pages by URL.
///
/// Implemented by [`ArticleFetcher`] for real HTTP traffic; the run is
/// generic over it so it can be driven by in-memory pages.
pub trait PageSource {
    async fn fetch(&self, url: &str) -> PageResult;
}

/// Build the HTTP client shared by the feed reader and article fetcher.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

/// Fetches article pages over HTTP(S).
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    client: Client,
}

impl ArticleFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

impl PageSource for ArticleFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> PageResult {
        match self.try_fetch(url).await {
            Ok(body) => {
                debug!(bytes = body.len(), "Fetched article page");
                PageResult::Ok(body)
            }
            Err(e) => {
                debug!(kind = e.kind(), error = %e, "Article fetch failed");
                PageResult::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestServer, WarnCounter, TEST_USER_AGENT};

    fn fetcher(timeout: Duration) -> ArticleFetcher {
        ArticleFetcher::new(build_client(TEST_USER_AGENT, timeout).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_ok_sends_client_identifier() {
        let server = TestServer::start(|path| match path {
            "/sak" => (200, "<p>Innhold</p>".to_string()),
            _ => (404, String::new()),
        });

        let result = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/sak", server.base_url))
            .await;

        match result {
            PageResult::Ok(body) => assert_eq!(body, "<p>Innhold</p>"),
            PageResult::Failed(e) => panic!("unexpected failure: {e}"),
        }
        assert_eq!(server.user_agents(), vec![TEST_USER_AGENT.to_string()]);
    }

    #[tokio::test]
    async fn test_non_success_status_is_failed() {
        let server = TestServer::start(|_| (404, "not here".to_string()));

        let result = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/borte", server.base_url))
            .await;

        assert!(matches!(result, PageResult::Failed(FetchError::Status(404))));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_warning_to_caller() {
        let server = TestServer::start(|_| (500, String::new()));
        let warnings = WarnCounter::default();
        let _guard = warnings.install();

        let result = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/feil", server.base_url))
            .await;

        assert!(matches!(result, PageResult::Failed(FetchError::Status(500))));
        assert_eq!(warnings.count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_failed() {
        let server = TestServer::start(|_| (200, String::new()));
        let url = format!("{}/sak", server.base_url);
        drop(server);

        let result = fetcher(Duration::from_secs(2)).fetch(&url).await;
        assert!(matches!(result, PageResult::Failed(FetchError::Request(_))));
    }

    #[tokio::test]
    async fn test_slow_page_times_out() {
        let server = TestServer::start(|_| {
            std::thread::sleep(Duration::from_millis(1500));
            (200, "for sent".to_string())
        });

        let result = fetcher(Duration::from_millis(300))
            .fetch(&format!("{}/treg", server.base_url))
            .await;

        assert!(matches!(result, PageResult::Failed(FetchError::Request(_))));
    }
}
