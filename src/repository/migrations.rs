//! Database schema bootstrap.
//!
//! Creates all tables if they do not already exist. Statements mirror the
//! Diesel table definitions in `crate::schema`.

use diesel_async::SimpleAsyncConnection;

use super::pool::{AsyncSqlitePool, DieselError};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS trips (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    departure_date TEXT NOT NULL,
    return_date TEXT,
    travelers INTEGER NOT NULL DEFAULT 1,
    trip_type TEXT NOT NULL DEFAULT 'flight',
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trips_user ON trips(user_id);
CREATE INDEX IF NOT EXISTS idx_trips_departure ON trips(departure_date);

CREATE TABLE IF NOT EXISTS price_watches (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    trip_id TEXT NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
    provider TEXT NOT NULL DEFAULT 'google_flights',
    target_price BIGINT NOT NULL,
    currency TEXT NOT NULL DEFAULT 'USD',
    is_active INTEGER NOT NULL DEFAULT 1,
    cooldown_hours INTEGER NOT NULL DEFAULT 6,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_watches_trip ON price_watches(trip_id);

CREATE TABLE IF NOT EXISTS price_snapshots (
    id TEXT PRIMARY KEY,
    trip_id TEXT NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    provider TEXT NOT NULL,
    price BIGINT NOT NULL,
    currency TEXT NOT NULL DEFAULT 'USD',
    cabin_class TEXT,
    airline TEXT,
    outbound_departure TEXT,
    outbound_arrival TEXT,
    return_departure TEXT,
    return_arrival TEXT,
    stops INTEGER,
    raw_data TEXT,
    scraped_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_snapshots_trip ON price_snapshots(trip_id);
CREATE INDEX IF NOT EXISTS idx_snapshots_provider ON price_snapshots(provider);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    watch_id TEXT NOT NULL REFERENCES price_watches(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    snapshot_id TEXT NOT NULL REFERENCES price_snapshots(id) ON DELETE CASCADE,
    alert_type TEXT NOT NULL DEFAULT 'price_drop',
    channel TEXT NOT NULL DEFAULT 'email',
    status TEXT NOT NULL,
    target_price BIGINT NOT NULL,
    triggered_price BIGINT NOT NULL,
    message TEXT,
    sent_at TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_watch ON alerts(watch_id);
CREATE INDEX IF NOT EXISTS idx_alerts_user ON alerts(user_id);
"#;

/// Create all tables and indexes if missing.
pub async fn run(pool: &AsyncSqlitePool) -> Result<(), DieselError> {
    let mut conn = pool.get().await?;
    conn.batch_execute(SCHEMA_SQL).await?;
    Ok(())
}
