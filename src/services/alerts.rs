//! Alert evaluation: match fresh snapshots against active watches,
//! apply threshold and cooldown, and dispatch notifications.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::ServiceError;
use crate::models::{
    format_cents, Alert, AlertStatus, PriceSnapshot, PriceWatch, Trip, User,
};
use crate::notifications::{notifier_for, NotificationPayload, Notifier};
use crate::repository::{AlertRepository, TripRepository, UserRepository, WatchRepository};

use std::sync::Arc;

#[derive(Clone)]
pub struct AlertService {
    watches: WatchRepository,
    alerts: AlertRepository,
    users: UserRepository,
    trips: TripRepository,
    notifier: Arc<dyn Notifier>,
}

impl AlertService {
    pub fn new(
        watches: WatchRepository,
        alerts: AlertRepository,
        users: UserRepository,
        trips: TripRepository,
    ) -> Self {
        Self {
            watches,
            alerts,
            users,
            trips,
            notifier: Arc::from(notifier_for(crate::models::AlertChannel::Email)),
        }
    }

    /// Replace the notification transport. Used by tests and alternate
    /// delivery setups.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Evaluate fresh snapshots against every active watch on the trip.
    ///
    /// For each watch, the lowest price among snapshots from the watch's
    /// provider is compared against the target. A price at or below the
    /// target fires the alert unless the watch is in cooldown. Returns the
    /// alerts created, with their final delivery status.
    pub async fn check_and_alert(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
        snapshots: &[PriceSnapshot],
    ) -> Result<Vec<Alert>, ServiceError> {
        let watches = self.watches.active_for_trip(trip_id, user_id).await?;
        if watches.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_provider: HashMap<&str, Vec<&PriceSnapshot>> = HashMap::new();
        for snap in snapshots {
            by_provider.entry(&snap.provider).or_default().push(snap);
        }

        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        let trip = self
            .trips
            .get_owned(trip_id, user_id)
            .await?
            .ok_or(ServiceError::TripNotFound)?;

        let mut fired = Vec::new();
        for watch in watches {
            let Some(best) = by_provider
                .get(watch.provider.as_str())
                .and_then(|snaps| snaps.iter().min_by_key(|s| s.price))
            else {
                continue;
            };

            // Inclusive threshold: a price equal to the target fires
            if best.price > watch.target_price {
                continue;
            }

            if self.is_in_cooldown(&watch).await? {
                debug!(watch_id = %watch.id, "watch in cooldown, skipping alert");
                continue;
            }

            let alert = self.create_and_send(&watch, best, &user, &trip).await?;
            fired.push(alert);
        }

        Ok(fired)
    }

    /// Alert history for a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Alert>, ServiceError> {
        Ok(self.alerts.list_for_user(user_id, limit).await?)
    }

    /// A watch is in cooldown when a successfully sent alert exists inside
    /// its cooldown window. Failed sends never start a cooldown.
    async fn is_in_cooldown(&self, watch: &PriceWatch) -> Result<bool, ServiceError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(watch.cooldown_hours));
        let sent = self.alerts.sent_count_since(watch.id, cutoff).await?;
        Ok(sent > 0)
    }

    async fn create_and_send(
        &self,
        watch: &PriceWatch,
        snapshot: &PriceSnapshot,
        user: &User,
        trip: &Trip,
    ) -> Result<Alert, ServiceError> {
        let message = build_alert_message(watch, snapshot, trip);
        let mut alert = Alert::pending(
            watch.id,
            user.id,
            snapshot.id,
            watch.target_price,
            snapshot.price,
            message.clone(),
        );
        self.alerts.insert(&alert).await?;

        let payload = NotificationPayload {
            recipient_email: user.email.clone(),
            recipient_name: user.full_name.clone(),
            subject: format!("Price drop alert: {} -> {}", trip.origin, trip.destination),
            body: message,
            alert_id: alert.id,
        };

        match self.notifier.send(&payload).await {
            Ok(true) => {
                alert.status = AlertStatus::Sent;
                alert.sent_at = Some(Utc::now());
            }
            Ok(false) => {
                alert.status = AlertStatus::Failed;
            }
            Err(err) => {
                error!(alert_id = %alert.id, error = %err, "notification send failed");
                alert.status = AlertStatus::Failed;
            }
        }
        self.alerts
            .mark_outcome(alert.id, alert.status, alert.sent_at)
            .await?;

        info!(
            alert_id = %alert.id,
            watch_id = %watch.id,
            status = alert.status.as_str(),
            price = snapshot.price,
            target = watch.target_price,
            "alert created"
        );
        Ok(alert)
    }
}

fn build_alert_message(watch: &PriceWatch, snapshot: &PriceSnapshot, trip: &Trip) -> String {
    format!(
        "Great news! A flight from {} to {} on {} is now {}, which is {} below your target of {}.",
        trip.origin,
        trip.destination,
        trip.departure_date,
        format_cents(snapshot.price),
        format_cents(watch.target_price - snapshot.price),
        format_cents(watch.target_price),
    )
}
