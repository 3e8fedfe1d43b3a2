// =============================================================================
// fetcher.rs - ONE PAGE AT A TIME
// =============================================================================
//
// Fetches page N of the aggregator. Three possible answers:
//
//   Ok(Markup)           - we got a page, go find incidents in it
//   Ok(EndOfPagination)  - the site said something other than 2xx. That is
//                          how it tells us the list is over (probably).
//   Err(FetchError)      - timeout, refused connection, broken body
//
// A non-success status is never retried and never an error. It is the
// normal way a crawl ends. Transport failures can be retried if the
// operator asks for it; by default they are not.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("connection failed for {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// Timeouts and connection errors are worth another attempt.
    fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout { .. } | FetchError::Connect { .. })
    }
}

/// What came back for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Markup(String),
    EndOfPagination(StatusCode),
}

pub struct PageFetcher {
    client: Client,
    config: Arc<Config>,
}

impl PageFetcher {
    pub fn new(config: Arc<Config>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetch page `page` (1-based), retrying transport failures up to
    /// `fetch_retries` extra times with exponential backoff.
    pub async fn fetch(&self, page: u32) -> Result<PageOutcome, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.fetch_once(page).await {
                Err(e) if e.is_transient() && attempt < self.config.fetch_retries => {
                    attempt += 1;
                    let delay = backoff_delay(self.config.retry_backoff, attempt);
                    warn!(
                        page = page,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Page fetch failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(&self, page: u32) -> Result<PageOutcome, FetchError> {
        let url = self.config.page_url(page);
        debug!(page = page, url = url.as_str(), "Fetching page");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| classify_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(page = page, status = %status, "Non-success status, treating as end of pagination");
            return Ok(PageOutcome::EndOfPagination(status));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.clone() }
            } else {
                FetchError::Body { url: url.clone(), source: e }
            }
        })?;

        Ok(PageOutcome::Markup(body))
    }
}

fn classify_send_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else if e.is_connect() || e.is_request() {
        FetchError::Connect { url: url.to_string(), source: e }
    } else {
        FetchError::Client(e)
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt.saturating_sub(1).min(5))
}
