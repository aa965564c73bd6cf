//! Price snapshot repository.
//!
//! Snapshots are append-only; there are no update or delete operations.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::fmt_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::SnapshotRecord;
use crate::models::PriceSnapshot;
use crate::schema::price_snapshots;

#[derive(Clone)]
pub struct SnapshotRepository {
    pool: AsyncSqlitePool,
}

impl SnapshotRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a snapshot row.
    pub async fn insert(&self, snap: &PriceSnapshot) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(price_snapshots::table)
            .values((
                price_snapshots::id.eq(snap.id.to_string()),
                price_snapshots::trip_id.eq(snap.trip_id.to_string()),
                price_snapshots::user_id.eq(snap.user_id.to_string()),
                price_snapshots::provider.eq(&snap.provider),
                price_snapshots::price.eq(snap.price),
                price_snapshots::currency.eq(&snap.currency),
                price_snapshots::cabin_class.eq(snap.cabin_class.map(|c| c.as_str())),
                price_snapshots::airline.eq(&snap.airline),
                price_snapshots::outbound_departure.eq(snap.outbound_departure.map(fmt_datetime)),
                price_snapshots::outbound_arrival.eq(snap.outbound_arrival.map(fmt_datetime)),
                price_snapshots::return_departure.eq(snap.return_departure.map(fmt_datetime)),
                price_snapshots::return_arrival.eq(snap.return_arrival.map(fmt_datetime)),
                price_snapshots::stops.eq(snap.stops),
                price_snapshots::raw_data.eq(&snap.raw_data),
                price_snapshots::scraped_at.eq(fmt_datetime(snap.scraped_at)),
                price_snapshots::created_at.eq(fmt_datetime(snap.created_at)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Price history for a trip, newest scrape first, optionally filtered
    /// by provider.
    pub async fn history(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
        provider: Option<&str>,
        limit: i64,
    ) -> Result<Vec<PriceSnapshot>, DieselError> {
        let mut conn = self.pool.get().await?;

        let mut query = price_snapshots::table
            .filter(price_snapshots::trip_id.eq(trip_id.to_string()))
            .filter(price_snapshots::user_id.eq(user_id.to_string()))
            .into_boxed();

        if let Some(provider) = provider {
            query = query.filter(price_snapshots::provider.eq(provider.to_string()));
        }

        query
            .order(price_snapshots::scraped_at.desc())
            .limit(limit)
            .load::<SnapshotRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(PriceSnapshot::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CabinClass, Trip, User};
    use crate::repository::{migrations, TripRepository, UserRepository};
    use chrono::{NaiveDate, Utc};
    use tempfile::tempdir;

    fn snapshot(trip: &Trip, provider: &str, price: i64) -> PriceSnapshot {
        PriceSnapshot {
            id: Uuid::new_v4(),
            trip_id: trip.id,
            user_id: trip.user_id,
            provider: provider.to_string(),
            price,
            currency: "USD".to_string(),
            cabin_class: Some(CabinClass::Economy),
            airline: Some("Delta".to_string()),
            outbound_departure: None,
            outbound_arrival: None,
            return_departure: None,
            return_arrival: None,
            stops: Some(0),
            raw_data: Some(r#"{"price":"$220"}"#.to_string()),
            scraped_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_history_filtering() {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        migrations::run(&pool).await.unwrap();

        let user = User::new("m@example.com".to_string(), "Margaret".to_string());
        UserRepository::new(pool.clone())
            .insert(&user)
            .await
            .unwrap();
        let trip = Trip::new(
            user.id,
            "JFK".to_string(),
            "SFO".to_string(),
            NaiveDate::from_ymd_opt(2027, 9, 10).unwrap(),
            None,
            2,
        );
        TripRepository::new(pool.clone())
            .insert(&trip)
            .await
            .unwrap();

        let repo = SnapshotRepository::new(pool);
        repo.insert(&snapshot(&trip, "google_flights", 22_000))
            .await
            .unwrap();
        repo.insert(&snapshot(&trip, "google_flights", 28_000))
            .await
            .unwrap();
        repo.insert(&snapshot(&trip, "kayak", 21_000)).await.unwrap();

        let all = repo.history(trip.id, user.id, None, 50).await.unwrap();
        assert_eq!(all.len(), 3);

        let google = repo
            .history(trip.id, user.id, Some("google_flights"), 50)
            .await
            .unwrap();
        assert_eq!(google.len(), 2);
        assert!(google.iter().all(|s| s.provider == "google_flights"));
    }
}
