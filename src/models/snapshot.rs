//! Price snapshot model - one immutable scraped price observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cabin class for flight searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Economy => "economy",
            Self::PremiumEconomy => "premium_economy",
            Self::Business => "business",
            Self::First => "first",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "economy" => Some(Self::Economy),
            "premium_economy" => Some(Self::PremiumEconomy),
            "business" => Some(Self::Business),
            "first" => Some(Self::First),
            _ => None,
        }
    }
}

/// An immutable record of a scraped price from a travel provider.
///
/// Snapshots are append-only: each scrape produces new rows and existing
/// rows are never updated or merged, so the table doubles as price history
/// for trend queries. Prices are integer cents to avoid floating-point
/// rounding drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub user_id: Uuid,
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
    /// Raw provider payload serialized to text (JSON) for diagnostics.
    pub raw_data: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cabin_class_roundtrip() {
        for c in [
            CabinClass::Economy,
            CabinClass::PremiumEconomy,
            CabinClass::Business,
            CabinClass::First,
        ] {
            assert_eq!(CabinClass::from_str(c.as_str()), Some(c));
        }
        assert_eq!(CabinClass::from_str("coach"), None);
    }

    #[test]
    fn test_cabin_class_default_is_economy() {
        assert_eq!(CabinClass::default(), CabinClass::Economy);
    }
}
