//! Provider scraping subsystem.
//!
//! Each travel provider is a plugin implementing [`Scraper`]. The trait's
//! provided `execute` method wraps the provider-specific `scrape` with a
//! rate-limit check and an exponential-backoff retry loop, so plugins only
//! contain fetch-and-extract logic.

pub mod browser;
pub mod flights;
pub mod proxy;
pub mod rate_limit;
pub mod registry;
pub mod user_agent;

pub use proxy::ProxyRotation;
pub use rate_limit::{MemoryRateLimitBackend, RateLimitBackend, RateLimiter};
pub use registry::{available_providers, get_scraper, ScraperEnv};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::CabinClass;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// Upper bound on backoff jitter.
const MAX_JITTER_MS: u64 = 500;

/// Input parameters for a scrape operation.
#[derive(Debug, Clone)]
pub struct ScrapeQuery {
    /// Origin IATA airport code.
    pub origin: String,
    /// Destination IATA airport code.
    pub destination: String,
    pub departure_date: NaiveDate,
    /// None for one-way trips. When present, logically after the departure
    /// date; enforced by the caller, not here.
    pub return_date: Option<NaiveDate>,
    pub travelers: i32,
    pub cabin_class: CabinClass,
    /// Correlation ids, set by the service layer.
    pub trip_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl ScrapeQuery {
    pub fn new(origin: String, destination: String, departure_date: NaiveDate) -> Self {
        Self {
            origin,
            destination,
            departure_date,
            return_date: None,
            travelers: 1,
            cabin_class: CabinClass::Economy,
            trip_id: None,
            user_id: None,
        }
    }
}

/// A single price result returned by a scraper.
#[derive(Debug, Clone)]
pub struct PriceResult {
    pub provider: String,
    /// Price in cents.
    pub price: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    pub cabin_class: Option<CabinClass>,
    pub airline: Option<String>,
    pub outbound_departure: Option<DateTime<Utc>>,
    pub outbound_arrival: Option<DateTime<Utc>>,
    pub return_departure: Option<DateTime<Utc>>,
    pub return_arrival: Option<DateTime<Utc>>,
    pub stops: Option<i32>,
    /// Raw provider payload for diagnostics.
    pub raw_data: Option<serde_json::Value>,
    pub scraped_at: DateTime<Utc>,
}

impl PriceResult {
    pub fn new(provider: &str, price: i64) -> Self {
        Self {
            provider: provider.to_string(),
            price,
            currency: "USD".to_string(),
            cabin_class: None,
            airline: None,
            outbound_departure: None,
            outbound_arrival: None,
            return_departure: None,
            return_arrival: None,
            stops: None,
            raw_data: None,
            scraped_at: Utc::now(),
        }
    }
}

/// Failure of a scrape operation.
///
/// Rate-limit violations and retry exhaustion share this type and are
/// distinguished by variant; both always surface to the caller.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("[{provider}] rate limit exceeded ({limit}/{window_secs}s), retry after {retry_after_secs}s")]
    RateLimited {
        provider: String,
        limit: u32,
        window_secs: u64,
        retry_after_secs: i64,
    },

    #[error("[{provider}] {message} (after {retries} retries)")]
    Exhausted {
        provider: String,
        message: String,
        retries: u32,
    },

    #[error("unknown scraper provider '{provider}'; available: {available}")]
    UnknownProvider { provider: String, available: String },
}

impl ScrapeError {
    /// Retry count reported by this error, if any.
    pub fn retries(&self) -> Option<u32> {
        match self {
            Self::Exhausted { retries, .. } => Some(*retries),
            _ => None,
        }
    }
}

/// Retry, rate-limit, and timeout knobs for a scraper.
#[derive(Debug, Clone)]
pub struct ScrapeLimits {
    /// Maximum retry attempts after the first failure.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Requests allowed per rate-limit window.
    pub rate_limit_requests: u32,
    /// Rate-limit window length.
    pub rate_limit_window: Duration,
    /// Plain HTTP request timeout.
    pub timeout: Duration,
    /// Browser page operation timeout.
    pub page_timeout: Duration,
}

impl Default for ScrapeLimits {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            rate_limit_requests: 10,
            rate_limit_window: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
            page_timeout: Duration::from_secs(45),
        }
    }
}

/// Backoff delay for the given attempt: `base * 2^attempt` plus up to
/// half a second of jitter, capped at one minute. The jitter prevents
/// thundering-herd retries across concurrent scrapes.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt));
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS));
    (exp + jitter).min(MAX_BACKOFF)
}

/// A price scraper for one provider.
///
/// Implementations supply `scrape`; callers go through `execute`, which
/// adds the rate-limit check and retry loop.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Provider identifier (e.g. "google_flights").
    fn provider(&self) -> &str;

    fn limits(&self) -> &ScrapeLimits;

    fn rate_limiter(&self) -> &RateLimiter;

    /// Provider-specific fetch and extraction. One attempt, no retries.
    async fn scrape(&self, query: &ScrapeQuery) -> anyhow::Result<Vec<PriceResult>>;

    /// Public entry point: rate-limit check, then retry loop around `scrape`.
    async fn execute(&self, query: &ScrapeQuery) -> Result<Vec<PriceResult>, ScrapeError> {
        let limits = self.limits();
        self.rate_limiter()
            .check(
                self.provider(),
                limits.rate_limit_requests,
                limits.rate_limit_window,
            )
            .await?;

        let mut last_error: Option<anyhow::Error> = None;
        for attempt in 0..=limits.max_retries {
            match self.scrape(query).await {
                Ok(results) => {
                    if attempt > 0 {
                        info!(
                            provider = self.provider(),
                            attempt = attempt + 1,
                            "scrape succeeded after retry"
                        );
                    }
                    return Ok(results);
                }
                Err(err) => {
                    if attempt < limits.max_retries {
                        let delay = backoff_delay(limits.base_delay, attempt);
                        warn!(
                            provider = self.provider(),
                            attempt = attempt + 1,
                            error = %err,
                            delay_ms = delay.as_millis() as u64,
                            "scrape attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(ScrapeError::Exhausted {
            provider: self.provider().to_string(),
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
            retries: limits.max_retries,
        })
    }
}
