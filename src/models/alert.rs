//! Alert model - the audit record of a triggered price watch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of price alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceDrop,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceDrop => "price_drop",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "price_drop" => Some(Self::PriceDrop),
            _ => None,
        }
    }
}

/// Notification delivery channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    Email,
}

impl AlertChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

/// Alert delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Sent,
    Failed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A record of a triggered price alert.
///
/// Immutable once created, except for status / sent-at finalization after
/// the notification attempt. Target and triggered prices are denormalized
/// on purpose: the watch target can change later, but the alert must freeze
/// the values that caused it to fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub watch_id: Uuid,
    pub user_id: Uuid,
    pub snapshot_id: Uuid,
    pub alert_type: AlertType,
    pub channel: AlertChannel,
    pub status: AlertStatus,
    /// Watch target at evaluation time, in cents.
    pub target_price: i64,
    /// Snapshot price that fired the alert, in cents.
    pub triggered_price: i64,
    pub message: Option<String>,
    /// Delivery timestamp; None unless status is sent.
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Create a pending price-drop alert for the email channel.
    pub fn pending(
        watch_id: Uuid,
        user_id: Uuid,
        snapshot_id: Uuid,
        target_price: i64,
        triggered_price: i64,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            watch_id,
            user_id,
            snapshot_id,
            alert_type: AlertType::PriceDrop,
            channel: AlertChannel::Email,
            status: AlertStatus::Pending,
            target_price,
            triggered_price,
            message: Some(message),
            sent_at: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in [AlertStatus::Pending, AlertStatus::Sent, AlertStatus::Failed] {
            assert_eq!(AlertStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(AlertStatus::from_str("queued"), None);
    }

    #[test]
    fn test_pending_alert_has_no_sent_at() {
        let alert = Alert::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            25_000,
            22_000,
            "msg".to_string(),
        );
        assert_eq!(alert.status, AlertStatus::Pending);
        assert!(alert.sent_at.is_none());
    }
}
