//! On-demand scraping: run a provider against a trip and persist the
//! results as price snapshots.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::ServiceError;
use crate::models::{CabinClass, PriceSnapshot, Trip};
use crate::repository::{DieselError, SnapshotRepository, TripRepository};
use crate::scrapers::{get_scraper, PriceResult, ScraperEnv, ScrapeQuery};

#[derive(Clone)]
pub struct ScrapeService {
    trips: TripRepository,
    snapshots: SnapshotRepository,
    env: ScraperEnv,
}

impl ScrapeService {
    pub fn new(trips: TripRepository, snapshots: SnapshotRepository, env: ScraperEnv) -> Self {
        Self {
            trips,
            snapshots,
            env,
        }
    }

    /// Scrape current prices for a trip and store them.
    ///
    /// The provider is resolved before any network work, so an unknown
    /// provider fails immediately.
    pub async fn scrape_trip(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
        provider: &str,
        cabin_class: CabinClass,
    ) -> Result<Vec<PriceSnapshot>, ServiceError> {
        let trip = self
            .trips
            .get_owned(trip_id, user_id)
            .await?
            .ok_or(ServiceError::TripNotFound)?;

        let scraper = get_scraper(provider, &self.env).map_err(ServiceError::InvalidProvider)?;

        let query = build_query(&trip, cabin_class);
        let results = scraper
            .execute(&query)
            .await
            .map_err(ServiceError::ScrapeFailed)?;

        let stored = self.store_results(results, trip_id, user_id).await?;
        info!(
            provider,
            trip_id = %trip_id,
            count = stored.len(),
            "stored price snapshots"
        );
        Ok(stored)
    }

    /// Price history for a trip, newest first. Ownership is checked before
    /// any rows are returned.
    pub async fn price_history(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
        provider: Option<&str>,
        limit: i64,
    ) -> Result<Vec<PriceSnapshot>, ServiceError> {
        self.trips
            .get_owned(trip_id, user_id)
            .await?
            .ok_or(ServiceError::TripNotFound)?;

        Ok(self
            .snapshots
            .history(trip_id, user_id, provider, limit)
            .await?)
    }

    async fn store_results(
        &self,
        results: Vec<PriceResult>,
        trip_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<PriceSnapshot>, DieselError> {
        let now = Utc::now();
        let mut stored = Vec::with_capacity(results.len());
        for result in results {
            let snapshot = PriceSnapshot {
                id: Uuid::new_v4(),
                trip_id,
                user_id,
                provider: result.provider,
                price: result.price,
                currency: result.currency,
                cabin_class: result.cabin_class,
                airline: result.airline,
                outbound_departure: result.outbound_departure,
                outbound_arrival: result.outbound_arrival,
                return_departure: result.return_departure,
                return_arrival: result.return_arrival,
                stops: result.stops,
                raw_data: result.raw_data.map(|v| v.to_string()),
                scraped_at: result.scraped_at,
                created_at: now,
            };
            self.snapshots.insert(&snapshot).await?;
            stored.push(snapshot);
        }
        Ok(stored)
    }
}

fn build_query(trip: &Trip, cabin_class: CabinClass) -> ScrapeQuery {
    ScrapeQuery {
        origin: trip.origin.clone(),
        destination: trip.destination.clone(),
        departure_date: trip.departure_date,
        return_date: trip.return_date,
        travelers: trip.travelers,
        cabin_class,
        trip_id: Some(trip.id),
        user_id: Some(trip.user_id),
    }
}
