//! Alert repository.
//!
//! Alerts are the audit trail of fired watches. Cooldown state is derived
//! from this table (successfully sent alerts within a window) rather than
//! from a denormalized column on the watch.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::fmt_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::AlertRecord;
use crate::models::{Alert, AlertStatus};
use crate::schema::alerts;

#[derive(Clone)]
pub struct AlertRepository {
    pool: AsyncSqlitePool,
}

impl AlertRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an alert row.
    pub async fn insert(&self, alert: &Alert) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(alerts::table)
            .values((
                alerts::id.eq(alert.id.to_string()),
                alerts::watch_id.eq(alert.watch_id.to_string()),
                alerts::user_id.eq(alert.user_id.to_string()),
                alerts::snapshot_id.eq(alert.snapshot_id.to_string()),
                alerts::alert_type.eq(alert.alert_type.as_str()),
                alerts::channel.eq(alert.channel.as_str()),
                alerts::status.eq(alert.status.as_str()),
                alerts::target_price.eq(alert.target_price),
                alerts::triggered_price.eq(alert.triggered_price),
                alerts::message.eq(&alert.message),
                alerts::sent_at.eq(alert.sent_at.map(fmt_datetime)),
                alerts::created_at.eq(fmt_datetime(alert.created_at)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Finalize an alert's delivery outcome.
    pub async fn mark_outcome(
        &self,
        alert_id: Uuid,
        status: AlertStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::update(alerts::table.find(alert_id.to_string()))
            .set((
                alerts::status.eq(status.as_str()),
                alerts::sent_at.eq(sent_at.map(fmt_datetime)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Count successfully sent alerts for a watch created after `cutoff`.
    ///
    /// Failed or pending alerts do not count: a failed notification must
    /// not block future attempts.
    pub async fn sent_count_since(
        &self,
        watch_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;

        alerts::table
            .filter(alerts::watch_id.eq(watch_id.to_string()))
            .filter(alerts::status.eq(AlertStatus::Sent.as_str()))
            .filter(alerts::created_at.gt(fmt_datetime(cutoff)))
            .count()
            .get_result(&mut conn)
            .await
    }

    /// Alert history for a user, newest first.
    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Alert>, DieselError> {
        let mut conn = self.pool.get().await?;

        alerts::table
            .filter(alerts::user_id.eq(user_id.to_string()))
            .order(alerts::created_at.desc())
            .limit(limit)
            .load::<AlertRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Alert::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::migrations;
    use chrono::Duration;
    use tempfile::tempdir;

    fn alert_at(watch_id: Uuid, status: AlertStatus, created_at: DateTime<Utc>) -> Alert {
        let mut alert = Alert::pending(
            watch_id,
            Uuid::new_v4(),
            Uuid::new_v4(),
            25_000,
            22_000,
            "msg".to_string(),
        );
        alert.status = status;
        alert.created_at = created_at;
        if status == AlertStatus::Sent {
            alert.sent_at = Some(created_at);
        }
        alert
    }

    #[tokio::test]
    async fn test_sent_count_since_ignores_failed_and_old() {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        migrations::run(&pool).await.unwrap();
        let repo = AlertRepository::new(pool);

        let watch_id = Uuid::new_v4();
        let now = Utc::now();

        repo.insert(&alert_at(watch_id, AlertStatus::Sent, now - Duration::hours(2)))
            .await
            .unwrap();
        repo.insert(&alert_at(watch_id, AlertStatus::Failed, now - Duration::hours(1)))
            .await
            .unwrap();
        repo.insert(&alert_at(watch_id, AlertStatus::Sent, now - Duration::hours(30)))
            .await
            .unwrap();

        // Only the 2h-old sent alert is inside a 6h window
        let count = repo
            .sent_count_since(watch_id, now - Duration::hours(6))
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Nothing sent within the last hour
        let count = repo
            .sent_count_since(watch_id, now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_mark_outcome_updates_status_and_sent_at() {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        migrations::run(&pool).await.unwrap();
        let repo = AlertRepository::new(pool);

        let alert = Alert::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            25_000,
            25_000,
            "boundary".to_string(),
        );
        repo.insert(&alert).await.unwrap();

        let sent_at = Utc::now();
        repo.mark_outcome(alert.id, AlertStatus::Sent, Some(sent_at))
            .await
            .unwrap();

        let listed = repo.list_for_user(alert.user_id, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, AlertStatus::Sent);
        assert!(listed[0].sent_at.is_some());
    }
}
