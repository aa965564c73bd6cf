//! Google Flights scraper.
//!
//! Google Flights is a JavaScript SPA; the HTML served without rendering
//! contains no flight data. The scraper drives a headless browser page,
//! waits for result cards to render, pulls each card's text, and hands
//! it to the line heuristics in [`super::parse`]. URL building and card
//! conversion are plain functions so they can be tested without a
//! browser.

use crate::models::CabinClass;
use crate::scrapers::flights::parse::parse_card;
use crate::scrapers::{PriceResult, ScrapeQuery};

pub const PROVIDER: &str = "google_flights";

const BASE_URL: &str = "https://www.google.com/travel/flights";

/// Google's `tfc` cabin parameter. Economy is the default and is omitted
/// from the URL.
fn cabin_code(cabin: CabinClass) -> u8 {
    match cabin {
        CabinClass::Economy => 1,
        CabinClass::PremiumEconomy => 2,
        CabinClass::Business => 3,
        CabinClass::First => 4,
    }
}

/// Build the search URL encoding route, dates, travelers, and cabin, so
/// fetched prices match the requested trip. Default-valued parameters
/// are omitted to keep URLs canonical.
pub fn build_search_url(query: &ScrapeQuery) -> String {
    let mut params = format!(
        "?hl=en&curr=USD&tfs={}-{}-{}",
        query.origin,
        query.destination,
        query.departure_date.format("%Y-%m-%d"),
    );
    if let Some(ret) = query.return_date {
        params.push_str(&format!("-{}", ret.format("%Y-%m-%d")));
    }
    if query.travelers > 1 {
        params.push_str(&format!("&tfa={}", query.travelers));
    }
    let cabin = cabin_code(query.cabin_class);
    if cabin != 1 {
        params.push_str(&format!("&tfc={cabin}"));
    }
    format!("{BASE_URL}{params}")
}

/// Convert extracted card texts into price results. Cards without a
/// parseable price are dropped; the parsed card (with its original
/// timing and duration strings) is kept on the result for diagnostics.
pub fn cards_to_results(card_texts: Vec<String>, query: &ScrapeQuery) -> Vec<PriceResult> {
    let now = chrono::Utc::now();
    card_texts
        .into_iter()
        .filter_map(|text| {
            let card = parse_card(&text)?;
            let mut result = PriceResult::new(PROVIDER, card.price_cents);
            result.cabin_class = Some(query.cabin_class);
            result.airline = card.airline.clone();
            result.stops = card.stops;
            result.raw_data = serde_json::to_value(&card).ok();
            result.scraped_at = now;
            Some(result)
        })
        .collect()
}

#[cfg(feature = "browser")]
pub use driver::GoogleFlightsScraper;

#[cfg(feature = "browser")]
mod driver {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Context;
    use async_trait::async_trait;
    use chromiumoxide::Page;
    use tracing::{debug, warn};

    use super::{build_search_url, cards_to_results, PROVIDER};
    use crate::scrapers::browser::BrowserPool;
    use crate::scrapers::user_agent::random_user_agent;
    use crate::scrapers::{
        PriceResult, ProxyRotation, RateLimiter, ScrapeLimits, ScrapeQuery, Scraper,
    };

    /// Result card containers, tried in order. The DOM changes often, so
    /// several strategies are kept.
    const RESULT_SELECTORS: &[&str] = &["[role='listitem']", "li[data-resultid]", "[data-price]"];

    /// Clicks the cookie consent button when the dialog is shown, in the
    /// top document and any same-origin iframes. Returns whether a button
    /// was clicked.
    const CONSENT_SCRIPT: &str = r#"
        () => {
            const labels = /^(reject all|accept all)$/i;
            const docs = [document];
            for (const frame of document.querySelectorAll('iframe')) {
                try {
                    if (frame.contentDocument) docs.push(frame.contentDocument);
                } catch (e) {}
            }
            for (const doc of docs) {
                const candidates = [
                    ...doc.querySelectorAll('button'),
                    ...doc.querySelectorAll('[aria-label]'),
                ];
                for (const el of candidates) {
                    const text = (el.innerText || el.getAttribute('aria-label') || '').trim();
                    if (labels.test(text)) {
                        el.click();
                        return true;
                    }
                }
            }
            return false;
        }
    "#;

    /// True once any dollar amount is visible on the page.
    const PRICE_VISIBLE_SCRIPT: &str =
        "() => document.body.innerText.match(/\\$\\d+/) !== null";

    /// Returns the innerText of each result card. Falls back to
    /// `data-price` attributes, surfaced as bare price lines, when no
    /// listitem cards are found.
    const CARD_TEXT_SCRIPT: &str = r#"
        () => {
            const texts = [];
            for (const item of document.querySelectorAll("[role='listitem']")) {
                const text = item.innerText || '';
                if (text.trim()) texts.push(text);
            }
            if (texts.length === 0) {
                for (const el of document.querySelectorAll('[data-price]')) {
                    const attr = el.getAttribute('data-price');
                    if (attr) texts.push('$' + attr.replace(/[$,]/g, ''));
                }
            }
            return texts;
        }
    "#;

    pub struct GoogleFlightsScraper {
        limits: ScrapeLimits,
        rate_limiter: RateLimiter,
        browser: Arc<BrowserPool>,
        proxies: Arc<ProxyRotation>,
    }

    impl GoogleFlightsScraper {
        pub fn new(
            limits: ScrapeLimits,
            rate_limiter: RateLimiter,
            browser: Arc<BrowserPool>,
            proxies: Arc<ProxyRotation>,
        ) -> Self {
            Self {
                limits,
                rate_limiter,
                browser,
                proxies,
            }
        }

        async fn scrape_page(
            &self,
            page: &Page,
            query: &ScrapeQuery,
        ) -> anyhow::Result<Vec<PriceResult>> {
            let url = build_search_url(query);
            debug!(provider = PROVIDER, %url, "navigating to search results");

            tokio::time::timeout(self.limits.page_timeout, page.goto(url.clone()))
                .await
                .map_err(|_| {
                    anyhow::anyhow!(
                        "navigation timed out after {}s for {url}",
                        self.limits.page_timeout.as_secs()
                    )
                })?
                .with_context(|| format!("navigation failed for {url}"))?;

            self.dismiss_consent(page).await;
            self.wait_for_results(page).await;

            let card_texts: Vec<String> = page
                .evaluate(CARD_TEXT_SCRIPT)
                .await
                .context("card extraction script failed")?
                .into_value()
                .context("unexpected card extraction output")?;

            let results = cards_to_results(card_texts, query);
            if results.is_empty() {
                warn!(
                    provider = PROVIDER,
                    origin = %query.origin,
                    destination = %query.destination,
                    "page loaded but no results extracted"
                );
            }
            Ok(results)
        }

        /// Dismiss the cookie consent dialog if present. Best effort; a
        /// missing dialog or failed click never fails the scrape.
        async fn dismiss_consent(&self, page: &Page) {
            let clicked = tokio::time::timeout(
                Duration::from_secs(2),
                page.evaluate(CONSENT_SCRIPT),
            )
            .await;
            match clicked {
                Ok(Ok(result)) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        debug!(provider = PROVIDER, "dismissed consent dialog");
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                }
                _ => debug!(provider = PROVIDER, "no consent dialog"),
            }
        }

        /// Poll until a result card selector matches, then fall back to
        /// waiting for any price-like text. Timing out here is not fatal;
        /// extraction proceeds with whatever rendered.
        async fn wait_for_results(&self, page: &Page) {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
            while tokio::time::Instant::now() < deadline {
                for selector in RESULT_SELECTORS {
                    if page.find_element(*selector).await.is_ok() {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
            }

            let fallback = tokio::time::Instant::now() + Duration::from_secs(10);
            while tokio::time::Instant::now() < fallback {
                if let Ok(result) = page.evaluate(PRICE_VISIBLE_SCRIPT).await {
                    if result.into_value::<bool>().unwrap_or(false) {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
            }

            warn!(provider = PROVIDER, "no flight results detected after waiting");
        }
    }

    #[async_trait]
    impl Scraper for GoogleFlightsScraper {
        fn provider(&self) -> &str {
            PROVIDER
        }

        fn limits(&self) -> &ScrapeLimits {
            &self.limits
        }

        fn rate_limiter(&self) -> &RateLimiter {
            &self.rate_limiter
        }

        async fn scrape(&self, query: &ScrapeQuery) -> anyhow::Result<Vec<PriceResult>> {
            let session = self
                .browser
                .open_session(random_user_agent(), self.proxies.next())
                .await?;
            let result = self.scrape_page(session.page(), query).await;
            session.close().await;
            result
        }
    }
}
