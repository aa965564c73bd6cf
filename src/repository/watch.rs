//! Price watch repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::fmt_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::WatchRecord;
use crate::models::PriceWatch;
use crate::schema::price_watches;

#[derive(Clone)]
pub struct WatchRepository {
    pool: AsyncSqlitePool,
}

impl WatchRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// List active watches for a trip, scoped to its owner.
    pub async fn active_for_trip(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<PriceWatch>, DieselError> {
        let mut conn = self.pool.get().await?;

        price_watches::table
            .filter(price_watches::trip_id.eq(trip_id.to_string()))
            .filter(price_watches::user_id.eq(user_id.to_string()))
            .filter(price_watches::is_active.eq(1))
            .load::<WatchRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(PriceWatch::from).collect())
    }

    /// Insert a watch.
    pub async fn insert(&self, watch: &PriceWatch) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(price_watches::table)
            .values((
                price_watches::id.eq(watch.id.to_string()),
                price_watches::user_id.eq(watch.user_id.to_string()),
                price_watches::trip_id.eq(watch.trip_id.to_string()),
                price_watches::provider.eq(&watch.provider),
                price_watches::target_price.eq(watch.target_price),
                price_watches::currency.eq(&watch.currency),
                price_watches::is_active.eq(watch.is_active as i32),
                price_watches::cooldown_hours.eq(watch.cooldown_hours),
                price_watches::created_at.eq(fmt_datetime(watch.created_at)),
                price_watches::updated_at.eq(fmt_datetime(watch.updated_at)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Activate or deactivate a watch.
    pub async fn set_active(&self, watch_id: Uuid, active: bool) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(price_watches::table.find(watch_id.to_string()))
            .set((
                price_watches::is_active.eq(active as i32),
                price_watches::updated_at.eq(fmt_datetime(chrono::Utc::now())),
            ))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Trip, User};
    use crate::repository::{migrations, TripRepository, UserRepository};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_active_for_trip_skips_inactive() {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        migrations::run(&pool).await.unwrap();

        let user = User::new("g@example.com".to_string(), "Grace".to_string());
        UserRepository::new(pool.clone())
            .insert(&user)
            .await
            .unwrap();
        let trip = Trip::new(
            user.id,
            "BOS".to_string(),
            "ORD".to_string(),
            NaiveDate::from_ymd_opt(2027, 3, 1).unwrap(),
            None,
            1,
        );
        TripRepository::new(pool.clone())
            .insert(&trip)
            .await
            .unwrap();

        let repo = WatchRepository::new(pool);
        let active =
            PriceWatch::new(user.id, trip.id, "google_flights".to_string(), 30_000, 6).unwrap();
        let mut inactive =
            PriceWatch::new(user.id, trip.id, "google_flights".to_string(), 20_000, 6).unwrap();
        inactive.is_active = false;
        repo.insert(&active).await.unwrap();
        repo.insert(&inactive).await.unwrap();

        let watches = repo.active_for_trip(trip.id, user.id).await.unwrap();
        assert_eq!(watches.len(), 1);
        assert_eq!(watches[0].id, active.id);

        // Deactivate the remaining watch
        assert!(repo.set_active(active.id, false).await.unwrap());
        assert!(repo.active_for_trip(trip.id, user.id).await.unwrap().is_empty());
    }
}
