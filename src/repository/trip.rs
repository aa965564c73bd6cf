//! Trip repository.

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::fmt_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::TripRecord;
use crate::models::Trip;
use crate::schema::trips;

#[derive(Clone)]
pub struct TripRepository {
    pool: AsyncSqlitePool,
}

impl TripRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a trip by id, scoped to its owner.
    ///
    /// A trip owned by another user is indistinguishable from a missing one.
    pub async fn get_owned(&self, trip_id: Uuid, user_id: Uuid) -> Result<Option<Trip>, DieselError> {
        let mut conn = self.pool.get().await?;

        trips::table
            .find(trip_id.to_string())
            .filter(trips::user_id.eq(user_id.to_string()))
            .first::<TripRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Trip::from))
    }

    /// Insert a trip.
    pub async fn insert(&self, trip: &Trip) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(trips::table)
            .values((
                trips::id.eq(trip.id.to_string()),
                trips::user_id.eq(trip.user_id.to_string()),
                trips::origin.eq(&trip.origin),
                trips::destination.eq(&trip.destination),
                trips::departure_date.eq(trip.departure_date.format("%Y-%m-%d").to_string()),
                trips::return_date
                    .eq(trip.return_date.map(|d| d.format("%Y-%m-%d").to_string())),
                trips::travelers.eq(trip.travelers),
                trips::trip_type.eq(trip.trip_type.as_str()),
                trips::notes.eq(&trip.notes),
                trips::created_at.eq(fmt_datetime(trip.created_at)),
                trips::updated_at.eq(fmt_datetime(trip.updated_at)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// List (trip_id, user_id) pairs for trips departing on or after `today`.
    ///
    /// This is the scheduler fan-out query; ordered by creation time so
    /// sweeps visit trips in a stable order.
    pub async fn active_refs(&self, today: NaiveDate) -> Result<Vec<(Uuid, Uuid)>, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(String, String)> = trips::table
            .filter(trips::departure_date.ge(today.format("%Y-%m-%d").to_string()))
            .order(trips::created_at.asc())
            .select((trips::id, trips::user_id))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(t, u)| (super::parse_uuid(&t), super::parse_uuid(&u)))
            .collect())
    }
}
