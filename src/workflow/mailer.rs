use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::db::Notification;

#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound email for committed notifications. Best effort only: the engine
/// calls it after commit and ignores failures beyond logging them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), MailError>;
}

/// Logs the hand-off instead of sending mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn deliver(&self, notification: &Notification) -> Result<(), MailError> {
        info!(
            notification_id = %notification.id,
            recipient = %notification.user_id,
            kind = ?notification.notification_type,
            "Email notification handed off"
        );
        Ok(())
    }
}
