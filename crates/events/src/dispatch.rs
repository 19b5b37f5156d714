//! Notification delivery task.
//!
//! Subscribes to the event bus and pushes the outbox rows referenced by each
//! event to the configured transports. Delivery is strictly best-effort:
//! every failure is logged and swallowed; nothing here can affect the
//! transaction that produced the notification.

use std::sync::Arc;

use courtside_db::models::notification::kinds;
use courtside_db::repositories::{NotificationRepo, UserRepo};
use courtside_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::BookingEvent;
use crate::delivery::{EmailDispatcher, OutgoingMail, PushDispatcher};

/// Sender address on cancellation emails.
const MAIL_FROM: &str = "no-reply@courtside.app";

/// Consumes booking events and delivers their notifications.
pub struct NotificationDispatcher {
    pool: DbPool,
    push: Arc<dyn PushDispatcher>,
    email: Arc<dyn EmailDispatcher>,
}

impl NotificationDispatcher {
    pub fn new(
        pool: DbPool,
        push: Arc<dyn PushDispatcher>,
        email: Arc<dyn EmailDispatcher>,
    ) -> Self {
        Self { pool, push, email }
    }

    /// Run until the bus sender is dropped.
    pub async fn run(self, mut rx: broadcast::Receiver<BookingEvent>) {
        tracing::info!("Notification dispatcher started");
        loop {
            match rx.recv().await {
                Ok(event) => self.deliver(&event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification dispatcher lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher stopping");
                    break;
                }
            }
        }
    }

    /// Deliver every outbox row referenced by one event.
    async fn deliver(&self, event: &BookingEvent) {
        for &notification_id in &event.notification_ids {
            let notification =
                match NotificationRepo::find_by_id(&self.pool, notification_id).await {
                    Ok(Some(n)) => n,
                    Ok(None) => {
                        tracing::warn!(notification_id, "Outbox row vanished before delivery");
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(notification_id, error = %e, "Outbox read failed");
                        continue;
                    }
                };

            // Cancellations also go out by email.
            if notification.kind == kinds::RESERVATION_CANCELLED {
                self.send_cancellation_mail(&notification).await;
            }

            let tokens = match NotificationRepo::push_tokens_for_user(
                &self.pool,
                notification.recipient_id,
            )
            .await
            {
                Ok(tokens) => tokens,
                Err(e) => {
                    tracing::error!(
                        recipient_id = notification.recipient_id,
                        error = %e,
                        "Push token lookup failed"
                    );
                    continue;
                }
            };
            if tokens.is_empty() {
                continue;
            }

            let data = serde_json::json!({
                "recipient_id": notification.recipient_id,
                "reservation_id": notification.reservation_id,
                "kind": notification.kind,
            });
            let title = notification.title.as_deref().unwrap_or("Courtside");

            if let Err(e) = self
                .push
                .send_multicast(&tokens, title, &notification.message, &data)
                .await
            {
                tracing::error!(
                    notification_id,
                    recipient_id = notification.recipient_id,
                    error = %e,
                    "Push delivery failed"
                );
            }
        }
    }

    /// Mirror a cancellation notification to the recipient's mailbox.
    async fn send_cancellation_mail(
        &self,
        notification: &courtside_db::models::notification::Notification,
    ) {
        let user = match UserRepo::find_by_id(&self.pool, notification.recipient_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(
                    recipient_id = notification.recipient_id,
                    error = %e,
                    "Recipient lookup failed"
                );
                return;
            }
        };

        let mail = OutgoingMail {
            from: MAIL_FROM.to_string(),
            to: user.email,
            subject: notification
                .title
                .clone()
                .unwrap_or_else(|| "Reservation cancelled".to_string()),
            html: format!("<p>{}</p>", notification.message),
        };
        if let Err(e) = self.email.send_mail(&mail).await {
            tracing::error!(
                recipient_id = notification.recipient_id,
                error = %e,
                "Email delivery failed"
            );
        }
    }
}
