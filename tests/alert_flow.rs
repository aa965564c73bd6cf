//! End-to-end alert evaluation tests against a real SQLite database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use farewatch::models::{
    Alert, AlertStatus, CabinClass, PriceSnapshot, PriceWatch, Trip, User,
};
use farewatch::notifications::{NotificationPayload, Notifier};
use farewatch::repository::{
    migrations, AlertRepository, AsyncSqlitePool, SnapshotRepository, TripRepository,
    UserRepository, WatchRepository,
};
use farewatch::scrapers::browser::{BrowserPool, BrowserSettings};
use farewatch::scrapers::{ProxyRotation, RateLimiter, ScrapeLimits, ScraperEnv};
use farewatch::services::{AlertService, ScrapeService, ServiceError};

/// Notifier that records payloads and returns a fixed outcome.
struct RecordingNotifier {
    sent: Mutex<Vec<NotificationPayload>>,
    succeed: bool,
}

impl RecordingNotifier {
    fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            succeed,
        })
    }

    async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, payload: &NotificationPayload) -> anyhow::Result<bool> {
        self.sent.lock().await.push(payload.clone());
        Ok(self.succeed)
    }
}

struct Fixture {
    pool: AsyncSqlitePool,
    _dir: tempfile::TempDir,
    user: User,
    trip: Trip,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        migrations::run(&pool).await.unwrap();

        let user = User::new("ada@example.com".to_string(), "Ada".to_string());
        UserRepository::new(pool.clone()).insert(&user).await.unwrap();

        let trip = Trip::new(
            user.id,
            "JFK".to_string(),
            "LAX".to_string(),
            NaiveDate::from_ymd_opt(2027, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2027, 6, 8),
            1,
        );
        TripRepository::new(pool.clone()).insert(&trip).await.unwrap();

        Self {
            pool,
            _dir: dir,
            user,
            trip,
        }
    }

    fn alert_service(&self, notifier: Arc<RecordingNotifier>) -> AlertService {
        AlertService::new(
            WatchRepository::new(self.pool.clone()),
            AlertRepository::new(self.pool.clone()),
            UserRepository::new(self.pool.clone()),
            TripRepository::new(self.pool.clone()),
        )
        .with_notifier(notifier)
    }

    async fn add_watch(&self, provider: &str, target_price: i64, cooldown_hours: i32) -> PriceWatch {
        let watch = PriceWatch::new(
            self.user.id,
            self.trip.id,
            provider.to_string(),
            target_price,
            cooldown_hours,
        )
        .unwrap();
        WatchRepository::new(self.pool.clone())
            .insert(&watch)
            .await
            .unwrap();
        watch
    }

    async fn add_snapshot(&self, provider: &str, price: i64) -> PriceSnapshot {
        let snap = PriceSnapshot {
            id: Uuid::new_v4(),
            trip_id: self.trip.id,
            user_id: self.user.id,
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
            raw_data: None,
            scraped_at: Utc::now(),
            created_at: Utc::now(),
        };
        SnapshotRepository::new(self.pool.clone())
            .insert(&snap)
            .await
            .unwrap();
        snap
    }
}

#[tokio::test]
async fn test_price_at_target_fires_alert() {
    let fx = Fixture::new().await;
    let notifier = RecordingNotifier::new(true);
    let service = fx.alert_service(Arc::clone(&notifier));

    fx.add_watch("google_flights", 25_000, 24).await;
    let snap = fx.add_snapshot("google_flights", 25_000).await;

    // Threshold is inclusive: equal price fires
    let alerts = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap])
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, AlertStatus::Sent);
    assert_eq!(alerts[0].triggered_price, 25_000);
    assert_eq!(alerts[0].target_price, 25_000);
    assert!(alerts[0].sent_at.is_some());
    assert_eq!(notifier.count().await, 1);

    let body = &notifier.sent.lock().await[0].body;
    assert!(body.contains("$250"), "unexpected message: {body}");
}

#[tokio::test]
async fn test_lowest_price_among_snapshots_wins() {
    let fx = Fixture::new().await;
    let notifier = RecordingNotifier::new(true);
    let service = fx.alert_service(notifier);

    fx.add_watch("google_flights", 25_000, 24).await;
    let high = fx.add_snapshot("google_flights", 28_000).await;
    let low = fx.add_snapshot("google_flights", 22_000).await;

    let alerts = service
        .check_and_alert(fx.trip.id, fx.user.id, &[high, low.clone()])
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].triggered_price, 22_000);
    assert_eq!(alerts[0].snapshot_id, low.id);
}

#[tokio::test]
async fn test_price_above_target_does_not_fire() {
    let fx = Fixture::new().await;
    let notifier = RecordingNotifier::new(true);
    let service = fx.alert_service(Arc::clone(&notifier));

    fx.add_watch("google_flights", 20_000, 24).await;
    let snap = fx.add_snapshot("google_flights", 20_001).await;

    let alerts = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap])
        .await
        .unwrap();
    assert!(alerts.is_empty());
    assert_eq!(notifier.count().await, 0);
}

#[tokio::test]
async fn test_inactive_and_mismatched_watches_never_fire() {
    let fx = Fixture::new().await;
    let notifier = RecordingNotifier::new(true);
    let service = fx.alert_service(Arc::clone(&notifier));

    let watch = fx.add_watch("google_flights", 30_000, 24).await;
    WatchRepository::new(fx.pool.clone())
        .set_active(watch.id, false)
        .await
        .unwrap();
    // Active watch on a provider the snapshots don't cover
    fx.add_watch("kayak", 30_000, 24).await;

    let snap = fx.add_snapshot("google_flights", 15_000).await;
    let alerts = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap])
        .await
        .unwrap();
    assert!(alerts.is_empty());
    assert_eq!(notifier.count().await, 0);
}

#[tokio::test]
async fn test_cooldown_blocks_repeat_alerts() {
    let fx = Fixture::new().await;
    let notifier = RecordingNotifier::new(true);
    let service = fx.alert_service(Arc::clone(&notifier));

    fx.add_watch("google_flights", 25_000, 6).await;
    let snap = fx.add_snapshot("google_flights", 24_000).await;

    let first = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap.clone()])
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    // Same watch immediately again: still in cooldown
    let second = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap])
        .await
        .unwrap();
    assert!(second.is_empty());
    assert_eq!(notifier.count().await, 1);
}

#[tokio::test]
async fn test_cooldown_still_active_just_inside_window() {
    let fx = Fixture::new().await;
    let notifier = RecordingNotifier::new(true);
    let service = fx.alert_service(Arc::clone(&notifier));

    let watch = fx.add_watch("google_flights", 25_000, 6).await;
    let snap = fx.add_snapshot("google_flights", 24_000).await;

    // A sent alert just inside the 6h window still blocks
    let mut recent = Alert::pending(
        watch.id,
        fx.user.id,
        snap.id,
        watch.target_price,
        24_000,
        "recent".to_string(),
    );
    recent.status = AlertStatus::Sent;
    recent.created_at = Utc::now() - Duration::hours(6) + Duration::minutes(1);
    recent.sent_at = Some(recent.created_at);
    AlertRepository::new(fx.pool.clone())
        .insert(&recent)
        .await
        .unwrap();

    let alerts = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap])
        .await
        .unwrap();
    assert!(alerts.is_empty());
    assert_eq!(notifier.count().await, 0);
}

#[tokio::test]
async fn test_cooldown_expires_after_window() {
    let fx = Fixture::new().await;
    let notifier = RecordingNotifier::new(true);
    let service = fx.alert_service(Arc::clone(&notifier));

    let watch = fx.add_watch("google_flights", 25_000, 6).await;
    let snap = fx.add_snapshot("google_flights", 24_000).await;

    // A sent alert just outside the 6h window must not block
    let mut old = Alert::pending(
        watch.id,
        fx.user.id,
        snap.id,
        watch.target_price,
        24_000,
        "old".to_string(),
    );
    old.status = AlertStatus::Sent;
    old.created_at = Utc::now() - Duration::hours(6) - Duration::minutes(1);
    old.sent_at = Some(old.created_at);
    AlertRepository::new(fx.pool.clone())
        .insert(&old)
        .await
        .unwrap();

    let alerts = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap])
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(notifier.count().await, 1);
}

#[tokio::test]
async fn test_failed_send_records_failure_and_does_not_start_cooldown() {
    let fx = Fixture::new().await;
    let failing = RecordingNotifier::new(false);
    let service = fx.alert_service(Arc::clone(&failing));

    fx.add_watch("google_flights", 25_000, 24).await;
    let snap = fx.add_snapshot("google_flights", 24_000).await;

    let alerts = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap.clone()])
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, AlertStatus::Failed);
    assert!(alerts[0].sent_at.is_none());

    // Failed delivery must not suppress the next evaluation
    let retry = service
        .check_and_alert(fx.trip.id, fx.user.id, &[snap])
        .await
        .unwrap();
    assert_eq!(retry.len(), 1);
    assert_eq!(failing.count().await, 2);
}

fn offline_env() -> ScraperEnv {
    ScraperEnv::new(
        ScrapeLimits::default(),
        RateLimiter::disabled(),
        Arc::new(ProxyRotation::empty()),
        Arc::new(BrowserPool::new(BrowserSettings::default())),
    )
}

#[tokio::test]
async fn test_unknown_provider_fails_before_any_scraping() {
    let fx = Fixture::new().await;
    let service = ScrapeService::new(
        TripRepository::new(fx.pool.clone()),
        SnapshotRepository::new(fx.pool.clone()),
        offline_env(),
    );

    let err = service
        .scrape_trip(fx.trip.id, fx.user.id, "skyscanner", CabinClass::Economy)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidProvider(_)));
}

#[tokio::test]
async fn test_scrape_missing_trip_is_not_found() {
    let fx = Fixture::new().await;
    let service = ScrapeService::new(
        TripRepository::new(fx.pool.clone()),
        SnapshotRepository::new(fx.pool.clone()),
        offline_env(),
    );

    let err = service
        .scrape_trip(Uuid::new_v4(), fx.user.id, "google_flights", CabinClass::Economy)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TripNotFound));

    // Someone else's user id hides the trip the same way
    let err = service
        .scrape_trip(fx.trip.id, Uuid::new_v4(), "google_flights", CabinClass::Economy)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TripNotFound));
}
