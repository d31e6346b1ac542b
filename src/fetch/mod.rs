//! Feed retrieval. One attempt per feed, no retries.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::{debug, warn};

use crate::error::{Error, Result};

fn transport(url: &str, message: impl ToString) -> Error {
    Error::TransportFailure {
        url: url.to_string(),
        message: message.to_string(),
    }
}

/// GETs `url` and returns the body. Non-2xx statuses are failures.
///
/// # Errors
///
/// Returns [`Error::TransportFailure`] on any network error, timeout or
/// unsuccessful status.
#[tracing::instrument(skip(client))]
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let parsed: reqwest::Url = url.parse().map_err(|e| transport(url, e))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await.map_err(|e| transport(url, e))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(transport(url, format!("HTTP status {status}")));
    }

    let bytes = resp.bytes().await.map_err(|e| transport(url, e))?;
    debug!(bytes = bytes.len(), "Feed body received");
    Ok(bytes.to_vec())
}

/// Reads `source` from disk, or over HTTP when it is an `http(s)` URL.
///
/// # Errors
///
/// Returns [`Error::TransportFailure`] when the source cannot be read.
pub async fn fetch_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http") {
        fetch_bytes(client, source).await
    } else {
        std::fs::read(source).map_err(|e| transport(source, e))
    }
}

/// Fetches an optional feed. Unconfigured or failed feeds yield `None`.
pub async fn fetch_optional<C: HttpClient>(
    client: &C,
    feed: &str,
    source: Option<&str>,
) -> Option<Vec<u8>> {
    let Some(source) = source else {
        warn!(feed, "Feed endpoint not configured, treating as unavailable");
        return None;
    };

    match fetch_source(client, source).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(feed, error = %e, "Optional feed unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::{Request, Response};
    use std::env;
    use std::fs;
    use std::sync::Mutex;

    /// Answers every request with a fixed status and body, recording URLs.
    struct CannedClient {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn execute(&self, req: Request) -> reqwest::Result<Response> {
            self.seen.lock().unwrap().push(req.url().to_string());
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(Response::from(resp))
        }
    }

    #[tokio::test]
    async fn test_success_status_returns_body() {
        let client = CannedClient::new(200, "a,b\n");
        let bytes = fetch_bytes(&client, "https://feeds.test/cases.csv")
            .await
            .unwrap();
        assert_eq!(bytes, b"a,b\n");
        assert_eq!(
            *client.seen.lock().unwrap(),
            vec!["https://feeds.test/cases.csv".to_string()]
        );
    }

    #[tokio::test]
    async fn test_error_status_is_transport_failure() {
        let client = CannedClient::new(500, "oops");
        let result = fetch_source(&client, "https://feeds.test/cases.csv").await;
        match result {
            Err(Error::TransportFailure { url, message }) => {
                assert_eq!(url, "https://feeds.test/cases.csv");
                assert!(message.contains("500"));
            }
            other => panic!("expected transport failure, got {other:?}"),
        }

        let optional = fetch_optional(&client, "summary", Some("https://feeds.test/s.json")).await;
        assert!(optional.is_none());
    }

    #[tokio::test]
    async fn test_unparsable_url_is_transport_failure() {
        let client = CannedClient::new(200, "");
        let result = fetch_bytes(&client, "http://").await;
        assert!(matches!(result, Err(Error::TransportFailure { .. })));
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_failure() {
        let client = BasicClient::new().unwrap();
        let result = fetch_bytes(&client, "http://127.0.0.1:1/cases.csv").await;
        assert!(matches!(result, Err(Error::TransportFailure { .. })));
    }

    #[tokio::test]
    async fn test_fetch_source_reads_local_file() {
        let path = format!("{}/measles_tracker_fetch_test.csv", env::temp_dir().display());
        fs::write(&path, b"a,b\n").unwrap();

        let client = BasicClient::new().unwrap();
        let bytes = fetch_source(&client, &path).await.unwrap();
        assert_eq!(bytes, b"a,b\n");

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_transport_failure() {
        let client = BasicClient::new().unwrap();
        let result = fetch_source(&client, "/nonexistent/cases.csv").await;
        assert!(matches!(result, Err(Error::TransportFailure { .. })));
    }

    #[tokio::test]
    async fn test_unconfigured_optional_feed_is_none() {
        let client = BasicClient::new().unwrap();
        assert!(fetch_optional(&client, "summary", None).await.is_none());
        assert!(
            fetch_optional(&client, "summary", Some("/nonexistent/summary.json"))
                .await
                .is_none()
        );
    }
}
