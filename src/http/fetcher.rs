//! HTTP Fetcher.
//!
//! Two operations, `fetch_json` and `fetch_html`, both returning `None`
//! rather than an error on any terminal failure. Retries are bounded and
//! apply only to status 429, status >= 500, or a network-level failure.
//! Any other non-success status (4xx other than 429) returns `None`
//! immediately, no retry.
//!
//! A single shared `reqwest::Client` sits behind a lazily-built static,
//! constructed once with a user-agent and a transport timeout.

use log::{debug, warn};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

const USER_AGENT: &str = "tcg-catalog-rs/0.1 (+catalog pipeline)";
const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(20);

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(TRANSPORT_TIMEOUT)
        .build()
        .expect("failed to build shared HTTP client")
});

/// Retry/backoff policy for a single fetcher instance. Adapters needing a
/// different cadence for JSON vs. HTML construct two `HttpFetcher`s, or
/// call whichever method matches the resource they're pulling.
#[derive(Debug, Clone, Copy)]
pub struct FetcherConfig {
    pub max_retries: u32,
    pub json_backoff_base: Duration,
    pub html_backoff_base: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            json_backoff_base: Duration::from_millis(400),
            html_backoff_base: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Fetch a JSON document. Returns `None` on any failure after the
    /// retry policy is exhausted, or immediately for non-retryable 4xx.
    pub async fn fetch_json(&self, url: &str) -> Option<serde_json::Value> {
        let body = self
            .fetch_with_retry(url, self.config.json_backoff_base)
            .await?;
        match serde_json::from_str(&body) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("fetch_json: {url} returned non-JSON body: {err}");
                None
            }
        }
    }

    /// Fetch an HTML document, same retry contract as `fetch_json`.
    pub async fn fetch_html(&self, url: &str) -> Option<String> {
        self.fetch_with_retry(url, self.config.html_backoff_base)
            .await
    }

    async fn fetch_with_retry(&self, url: &str, backoff_base: Duration) -> Option<String> {
        let mut attempt: u32 = 0;

        loop {
            let outcome = HTTP_CLIENT.get(url).send().await;

            match outcome {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.text().await.ok();
                    }

                    if !is_retryable_status(status) {
                        debug!("fetch: {url} returned non-retryable status {status}");
                        return None;
                    }

                    warn!("fetch: {url} returned {status}, attempt {attempt}");
                }
                Err(err) => {
                    warn!("fetch: {url} network error on attempt {attempt}: {err}");
                }
            }

            attempt += 1;
            if attempt >= self.config.max_retries {
                return None;
            }
            sleep(backoff_base * (attempt + 1)).await;
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_classification() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn default_config_has_expected_floors() {
        let config = FetcherConfig::default();
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.json_backoff_base, Duration::from_millis(400));
        assert_eq!(config.html_backoff_base, Duration::from_millis(500));
    }
}
