//! Price watch model - a standing alert rule for a trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lowest accepted alert cooldown, in hours.
pub const COOLDOWN_HOURS_MIN: i32 = 1;
/// Highest accepted alert cooldown, in hours (one week).
pub const COOLDOWN_HOURS_MAX: i32 = 168;

/// Invalid watch parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchValidationError {
    #[error("target price must be positive (got {0})")]
    NonPositiveTarget(i64),
    #[error(
        "cooldown must be between {COOLDOWN_HOURS_MIN} and {COOLDOWN_HOURS_MAX} hours (got {0})"
    )]
    CooldownOutOfRange(i32),
}

/// A monitoring rule that fires an alert when a scraped price for the
/// watched provider drops to or below the target.
///
/// There is deliberately no `last_alerted_at` column: cooldown state is
/// derived from Alert history, which cannot drift when a status write fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceWatch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    /// Provider this watch monitors (e.g. "google_flights").
    pub provider: String,
    /// Alert threshold in cents.
    pub target_price: i64,
    pub currency: String,
    pub is_active: bool,
    /// Minimum hours between successfully sent alerts for this watch.
    pub cooldown_hours: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PriceWatch {
    /// Create a new active watch, validating target and cooldown bounds.
    pub fn new(
        user_id: Uuid,
        trip_id: Uuid,
        provider: String,
        target_price: i64,
        cooldown_hours: i32,
    ) -> Result<Self, WatchValidationError> {
        Self::validate(target_price, cooldown_hours)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            trip_id,
            provider,
            target_price,
            currency: "USD".to_string(),
            is_active: true,
            cooldown_hours,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check watch invariants: positive target, bounded cooldown.
    pub fn validate(target_price: i64, cooldown_hours: i32) -> Result<(), WatchValidationError> {
        if target_price <= 0 {
            return Err(WatchValidationError::NonPositiveTarget(target_price));
        }
        if !(COOLDOWN_HOURS_MIN..=COOLDOWN_HOURS_MAX).contains(&cooldown_hours) {
            return Err(WatchValidationError::CooldownOutOfRange(cooldown_hours));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(PriceWatch::validate(1, COOLDOWN_HOURS_MIN).is_ok());
        assert!(PriceWatch::validate(25_000, COOLDOWN_HOURS_MAX).is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_target() {
        assert_eq!(
            PriceWatch::validate(0, 6),
            Err(WatchValidationError::NonPositiveTarget(0))
        );
        assert_eq!(
            PriceWatch::validate(-100, 6),
            Err(WatchValidationError::NonPositiveTarget(-100))
        );
    }

    #[test]
    fn test_validate_rejects_cooldown_out_of_range() {
        assert_eq!(
            PriceWatch::validate(100, 0),
            Err(WatchValidationError::CooldownOutOfRange(0))
        );
        assert_eq!(
            PriceWatch::validate(100, 169),
            Err(WatchValidationError::CooldownOutOfRange(169))
        );
    }
}
