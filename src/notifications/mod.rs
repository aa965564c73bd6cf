//! Notification dispatch.
//!
//! The only shipped notifier logs the email instead of talking to an
//! SMTP server; swap in a real transport by implementing [`Notifier`].

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::models::AlertChannel;

/// Data needed to send one notification.
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
    pub alert_id: Uuid,
}

/// A notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the notification. Ok(false) means a clean delivery failure;
    /// Err means the transport itself broke. Both mark the alert failed.
    async fn send(&self, payload: &NotificationPayload) -> anyhow::Result<bool>;
}

/// Logs the email instead of sending it.
pub struct LogEmailNotifier;

#[async_trait]
impl Notifier for LogEmailNotifier {
    async fn send(&self, payload: &NotificationPayload) -> anyhow::Result<bool> {
        info!(
            to = %payload.recipient_email,
            subject = %payload.subject,
            alert_id = %payload.alert_id,
            "EMAIL ALERT: {}",
            payload.body
        );
        Ok(true)
    }
}

/// The notifier for a channel.
pub fn notifier_for(channel: AlertChannel) -> Box<dyn Notifier> {
    match channel {
        AlertChannel::Email => Box::new(LogEmailNotifier),
    }
}
