//! Repository layer for database persistence.
//!
//! All database access uses Diesel with compile-time query checking over
//! an async SQLite connection (diesel-async SyncConnectionWrapper).

pub mod alert;
pub mod migrations;
pub mod pool;
pub mod records;
pub mod snapshot;
pub mod trip;
pub mod user;
pub mod watch;

pub use alert::AlertRepository;
pub use pool::{AsyncSqlitePool, DieselError};
pub use snapshot::SnapshotRepository;
pub use trip::TripRepository;
pub use user::UserRepository;
pub use watch::WatchRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Format a timestamp for storage.
///
/// Fixed microsecond precision keeps the text representation fixed-width,
/// so lexicographic comparison in SQL matches chronological order.
pub fn fmt_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Parse a UUID string from the database, defaulting to nil on error.
pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or(Uuid::nil())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_datetime_is_fixed_width() {
        let a = fmt_datetime(DateTime::UNIX_EPOCH);
        let b = fmt_datetime(Utc::now());
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_parse_datetime_roundtrip() {
        let now = Utc::now();
        let parsed = parse_datetime(&fmt_datetime(now));
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_parse_datetime_bad_input_is_epoch() {
        assert_eq!(parse_datetime("not a date"), DateTime::UNIX_EPOCH);
    }
}
