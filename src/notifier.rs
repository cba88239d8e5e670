use async_trait::async_trait;

use crate::domain::EmailAddress;

/// A plain-text message addressed to the site owner.
#[derive(Debug, Clone)]
pub struct Notification {
    pub subject: String,
    pub text_body: String,
    pub reply_to: Option<EmailAddress>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipient: &EmailAddress,
        notification: &Notification,
    ) -> Result<(), anyhow::Error>;
}

/// Writes notifications to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        recipient: &EmailAddress,
        notification: &Notification,
    ) -> Result<(), anyhow::Error> {
        tracing::info!(
            %recipient,
            subject = %notification.subject,
            body = %notification.text_body,
            "Notification not delivered, the log transport is active"
        );
        Ok(())
    }
}
