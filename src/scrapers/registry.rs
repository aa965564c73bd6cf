//! Scraper plugin registry.
//!
//! Providers are looked up by name; adding a provider means adding a
//! match arm here. Lookup never touches the network, so an unknown
//! provider fails before any browser or HTTP work happens.

use std::sync::Arc;

use super::browser::BrowserPool;
use super::proxy::ProxyRotation;
use super::rate_limit::RateLimiter;
use super::{ScrapeError, ScrapeLimits, Scraper};

#[cfg(feature = "browser")]
use super::flights::google::GoogleFlightsScraper;

/// Shared infrastructure handed to every scraper instance.
#[derive(Clone)]
pub struct ScraperEnv {
    pub limits: ScrapeLimits,
    pub rate_limiter: RateLimiter,
    pub proxies: Arc<ProxyRotation>,
    pub browser: Arc<BrowserPool>,
}

impl ScraperEnv {
    pub fn new(
        limits: ScrapeLimits,
        rate_limiter: RateLimiter,
        proxies: Arc<ProxyRotation>,
        browser: Arc<BrowserPool>,
    ) -> Self {
        Self {
            limits,
            rate_limiter,
            proxies,
            browser,
        }
    }
}

/// Provider names registered in this build.
pub fn available_providers() -> Vec<&'static str> {
    let mut providers = Vec::new();
    #[cfg(feature = "browser")]
    providers.push(super::flights::google::PROVIDER);
    providers
}

/// Instantiate the scraper for `provider`.
pub fn get_scraper(provider: &str, env: &ScraperEnv) -> Result<Arc<dyn Scraper>, ScrapeError> {
    match provider {
        #[cfg(feature = "browser")]
        "google_flights" => Ok(Arc::new(GoogleFlightsScraper::new(
            env.limits.clone(),
            env.rate_limiter.clone(),
            Arc::clone(&env.browser),
            Arc::clone(&env.proxies),
        ))),
        _ => Err(ScrapeError::UnknownProvider {
            provider: provider.to_string(),
            available: available_providers().join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::browser::BrowserSettings;

    fn env() -> ScraperEnv {
        ScraperEnv::new(
            ScrapeLimits::default(),
            RateLimiter::disabled(),
            Arc::new(ProxyRotation::empty()),
            Arc::new(BrowserPool::new(BrowserSettings::default())),
        )
    }

    #[test]
    fn test_unknown_provider_fails_fast() {
        let err = get_scraper("skyscanner", &env()).err().unwrap();
        match err {
            ScrapeError::UnknownProvider { provider, available } => {
                assert_eq!(provider, "skyscanner");
                for name in available_providers() {
                    assert!(available.contains(name));
                }
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "browser")]
    #[test]
    fn test_google_flights_is_registered() {
        let scraper = get_scraper("google_flights", &env()).unwrap();
        assert_eq!(scraper.provider(), "google_flights");
        assert!(available_providers().contains(&"google_flights"));
    }
}
