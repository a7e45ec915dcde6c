pub mod error;
pub mod types;

pub use error::{OtxError, Result};
pub use types::{FetchReport, FetchStop};

use std::future::Future;
use std::time::Duration;

use pulsegraph_common::Pulse;
use tracing::{info, warn};
use types::PulsePage;

pub const DEFAULT_BASE_URL: &str = "https://otx.alienvault.com/api/v1";

/// Header OTX reads the subscriber key from.
pub const API_KEY_HEADER: &str = "X-OTX-API-KEY";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A page whose attempt budget ran out.
struct PageFailure {
    attempts: u32,
    error: OtxError,
}

pub struct OtxClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl OtxClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// At least one attempt is always made.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Fetch a single page of subscribed pulses. One attempt, no retry.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<Pulse>> {
        let url = format!("{}/pulses/subscribed", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("page", page)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(OtxError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let page: PulsePage = serde_json::from_str(&body)?;
        Ok(page.results)
    }

    async fn fetch_page_with_retry(&self, page: u32) -> std::result::Result<Vec<Pulse>, PageFailure> {
        retry_fixed(page, self.max_attempts, self.retry_delay, || self.fetch_page(page)).await
    }

    /// Walk pages `1..=max_pages` in order, accumulating pulses.
    ///
    /// Stops for good at the first empty page or the first page whose
    /// attempts are all spent; either way the pulses gathered so far are
    /// returned.
    pub async fn fetch_all_pulses(&self, max_pages: u32) -> FetchReport {
        let mut pulses = Vec::new();
        let mut pages_fetched = 0;

        for page in 1..=max_pages {
            match self.fetch_page_with_retry(page).await {
                Ok(results) if results.is_empty() => {
                    info!(page, total = pulses.len(), "No more results, stopping");
                    return FetchReport {
                        pulses,
                        pages_fetched,
                        stop: FetchStop::Exhausted { page },
                    };
                }
                Ok(results) => {
                    pages_fetched += 1;
                    info!(page, count = results.len(), "Page fetched");
                    pulses.extend(results);
                }
                Err(PageFailure { attempts, error }) => {
                    warn!(page, attempts, error = %error, "Stopped fetching: page failed");
                    return FetchReport {
                        pulses,
                        pages_fetched,
                        stop: FetchStop::Failed {
                            page,
                            attempts,
                            error,
                        },
                    };
                }
            }
        }

        info!(max_pages, total = pulses.len(), "Page limit reached");
        FetchReport {
            pulses,
            pages_fetched,
            stop: FetchStop::PageLimit,
        }
    }
}

/// Run `attempt` up to `max_attempts` times, sleeping `delay` between
/// failures. No delay follows the last attempt.
async fn retry_fixed<T, F, Fut>(
    page: u32,
    max_attempts: u32,
    delay: Duration,
    mut attempt_fn: F,
) -> std::result::Result<T, PageFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        info!(page, attempt, "Fetching page");

        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= max_attempts => {
                return Err(PageFailure {
                    attempts: attempt,
                    error,
                });
            }
            Err(error) => {
                warn!(
                    page,
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    error = %error,
                    "Page fetch failed, retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
