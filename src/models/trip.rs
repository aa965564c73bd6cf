//! Trip model - a planned journey whose prices are monitored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported trip categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    Flight,
    Hotel,
    CarRental,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Hotel => "hotel",
            Self::CarRental => "car_rental",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "flight" => Some(Self::Flight),
            "hotel" => Some(Self::Hotel),
            "car_rental" => Some(Self::CarRental),
            _ => None,
        }
    }
}

/// A planned trip that a user wants to monitor prices for.
///
/// Origin and destination are IATA airport codes (e.g. "JFK", "LAX").
/// A missing return date means a one-way trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub user_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub travelers: i32,
    pub trip_type: TripType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Create a new trip with generated id and current timestamps.
    pub fn new(
        user_id: Uuid,
        origin: String,
        destination: String,
        departure_date: NaiveDate,
        return_date: Option<NaiveDate>,
        travelers: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            origin,
            destination,
            departure_date,
            return_date,
            travelers,
            trip_type: TripType::Flight,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_type_roundtrip() {
        for t in [TripType::Flight, TripType::Hotel, TripType::CarRental] {
            assert_eq!(TripType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(TripType::from_str("cruise"), None);
    }
}
