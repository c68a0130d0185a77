use db::models::notification::Notification;
use db::models::user::User;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::email::EmailService;

/// Best-effort notification fan-out: a Notification row plus an email.
/// Failures are logged and swallowed so they never abort the operation
/// that triggered them.
#[derive(Clone)]
pub struct Notifier {
    mailer: Option<EmailService>,
}

impl Notifier {
    pub fn new(mailer: Option<EmailService>) -> Self {
        Self { mailer }
    }

    pub async fn notify_user(&self, pool: &SqlitePool, user_id: Uuid, subject: &str, body: &str) {
        if let Err(e) = Notification::create(pool, user_id, subject, body).await {
            tracing::warn!("Failed to create notification for {}: {}", user_id, e);
        }

        let Some(mailer) = &self.mailer else {
            return;
        };

        let email = match User::find_by_id(pool, user_id).await {
            Ok(Some(user)) => user.email,
            Ok(None) => {
                tracing::warn!("Notification target {} does not exist", user_id);
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to load notification target {}: {}", user_id, e);
                return;
            }
        };

        if let Err(e) = mailer.send_email(&[email], subject, body).await {
            tracing::warn!("Failed to email notification to {}: {}", user_id, e);
        }
    }

    /// Plain email with no Notification row, for recipients who may not
    /// have an account yet (invite links, OTP codes).
    pub async fn send_email(&self, recipient: &str, subject: &str, body: &str) {
        let Some(mailer) = &self.mailer else {
            tracing::debug!("Mailer disabled, dropping email to {}", recipient);
            return;
        };
        if let Err(e) = mailer.send_email(&[recipient.to_string()], subject, body).await {
            tracing::warn!("Failed to send email to {}: {}", recipient, e);
        }
    }
}
