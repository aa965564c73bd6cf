//! Diesel row records and conversions to domain models.

use chrono::NaiveDate;
use diesel::prelude::*;

use super::{parse_datetime, parse_datetime_opt, parse_uuid};
use crate::models::{
    Alert, AlertChannel, AlertStatus, AlertType, CabinClass, PriceSnapshot, PriceWatch, Trip,
    TripType, User,
};
use crate::schema::{alerts, price_snapshots, price_watches, trips, users};

#[derive(Queryable, Selectable)]
#[diesel(table_name = users)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub is_active: i32,
    pub created_at: String,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        User {
            id: parse_uuid(&r.id),
            email: r.email,
            full_name: r.full_name,
            is_active: r.is_active != 0,
            created_at: parse_datetime(&r.created_at),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = trips)]
pub struct TripRecord {
    pub id: String,
    pub user_id: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub return_date: Option<String>,
    pub travelers: i32,
    pub trip_type: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TripRecord> for Trip {
    fn from(r: TripRecord) -> Self {
        Trip {
            id: parse_uuid(&r.id),
            user_id: parse_uuid(&r.user_id),
            origin: r.origin,
            destination: r.destination,
            departure_date: parse_date(&r.departure_date),
            return_date: r.return_date.as_deref().map(parse_date),
            travelers: r.travelers,
            trip_type: TripType::from_str(&r.trip_type).unwrap_or(TripType::Flight),
            notes: r.notes,
            created_at: parse_datetime(&r.created_at),
            updated_at: parse_datetime(&r.updated_at),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = price_watches)]
pub struct WatchRecord {
    pub id: String,
    pub user_id: String,
    pub trip_id: String,
    pub provider: String,
    pub target_price: i64,
    pub currency: String,
    pub is_active: i32,
    pub cooldown_hours: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<WatchRecord> for PriceWatch {
    fn from(r: WatchRecord) -> Self {
        PriceWatch {
            id: parse_uuid(&r.id),
            user_id: parse_uuid(&r.user_id),
            trip_id: parse_uuid(&r.trip_id),
            provider: r.provider,
            target_price: r.target_price,
            currency: r.currency,
            is_active: r.is_active != 0,
            cooldown_hours: r.cooldown_hours,
            created_at: parse_datetime(&r.created_at),
            updated_at: parse_datetime(&r.updated_at),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = price_snapshots)]
pub struct SnapshotRecord {
    pub id: String,
    pub trip_id: String,
    pub user_id: String,
    pub provider: String,
    pub price: i64,
    pub currency: String,
    pub cabin_class: Option<String>,
    pub airline: Option<String>,
    pub outbound_departure: Option<String>,
    pub outbound_arrival: Option<String>,
    pub return_departure: Option<String>,
    pub return_arrival: Option<String>,
    pub stops: Option<i32>,
    pub raw_data: Option<String>,
    pub scraped_at: String,
    pub created_at: String,
}

impl From<SnapshotRecord> for PriceSnapshot {
    fn from(r: SnapshotRecord) -> Self {
        PriceSnapshot {
            id: parse_uuid(&r.id),
            trip_id: parse_uuid(&r.trip_id),
            user_id: parse_uuid(&r.user_id),
            provider: r.provider,
            price: r.price,
            currency: r.currency,
            cabin_class: r.cabin_class.as_deref().and_then(CabinClass::from_str),
            airline: r.airline,
            outbound_departure: parse_datetime_opt(r.outbound_departure),
            outbound_arrival: parse_datetime_opt(r.outbound_arrival),
            return_departure: parse_datetime_opt(r.return_departure),
            return_arrival: parse_datetime_opt(r.return_arrival),
            stops: r.stops,
            raw_data: r.raw_data,
            scraped_at: parse_datetime(&r.scraped_at),
            created_at: parse_datetime(&r.created_at),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = alerts)]
pub struct AlertRecord {
    pub id: String,
    pub watch_id: String,
    pub user_id: String,
    pub snapshot_id: String,
    pub alert_type: String,
    pub channel: String,
    pub status: String,
    pub target_price: i64,
    pub triggered_price: i64,
    pub message: Option<String>,
    pub sent_at: Option<String>,
    pub created_at: String,
}

impl From<AlertRecord> for Alert {
    fn from(r: AlertRecord) -> Self {
        Alert {
            id: parse_uuid(&r.id),
            watch_id: parse_uuid(&r.watch_id),
            user_id: parse_uuid(&r.user_id),
            snapshot_id: parse_uuid(&r.snapshot_id),
            alert_type: AlertType::from_str(&r.alert_type).unwrap_or(AlertType::PriceDrop),
            channel: AlertChannel::from_str(&r.channel).unwrap_or(AlertChannel::Email),
            status: AlertStatus::from_str(&r.status).unwrap_or(AlertStatus::Failed),
            target_price: r.target_price,
            triggered_price: r.triggered_price,
            message: r.message,
            sent_at: parse_datetime_opt(r.sent_at),
            created_at: parse_datetime(&r.created_at),
        }
    }
}

/// Parse a stored ISO date, defaulting to the epoch day on error.
fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}
