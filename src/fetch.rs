//! HTTP fetch layer.
//!
//! One client per program scraper (cookies and connection reuse scoped to a
//! single program's run), a generic desktop browser user agent, and a bounded
//! per-request timeout. Every failure mode (timeout, connection error,
//! non-2xx status) is logged and surfaces as `None` so callers can decide
//! whether to skip the page or the whole program. Nothing here is fatal.

use std::time::Duration;

use reqwest::Client;
use tracing::error;

/// User agent sent with every request.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Build an HTTP client with the scraping user agent and a request timeout.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Fetch a page and return its body, or `None` if it was unavailable.
///
/// Non-2xx responses are treated the same as transport errors: the page is
/// unavailable, the failure is logged to the error stream, and processing
/// continues without it.
pub async fn fetch_page(client: &Client, url: &str) -> Option<String> {
    let response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!(%url, error = %e, "Fetch failed");
            return None;
        }
    };

    let response = match response.error_for_status() {
        Ok(resp) => resp,
        Err(e) => {
            error!(%url, error = %e, "Fetch returned error status");
            return None;
        }
    };

    match response.text().await {
        Ok(body) => Some(body),
        Err(e) => {
            error!(%url, error = %e, "Failed reading response body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(10)).is_ok());
    }
}
