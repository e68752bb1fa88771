//! Notification batches.
//!
//! Turns rendered PayUp notifications into queued send operations against a
//! `Mailer` and runs them through the rate-limited queue.

pub mod templates;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DispatchConfig;
use crate::queue::{send_emails_with_rate_limit, QueueResult, QueuedEmail, SendOutcome};
use crate::transport::{Mailer, MailerError, OutgoingEmail};

pub use templates::{ExpenseAdded, SettlementReminder};

/// Which flow produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ExpenseAdded,
    SettlementReminder,
    Custom,
}

/// A rendered notification ready for sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub email: OutgoingEmail,
}

/// One entry of a notification batch as submitted by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchEntry {
    ExpenseAdded(ExpenseAdded),
    SettlementReminder(SettlementReminder),
    /// Already-rendered email
    Custom(OutgoingEmail),
}

impl BatchEntry {
    /// Render this entry.
    pub fn into_notification(self) -> Notification {
        match self {
            BatchEntry::ExpenseAdded(e) => e.render(),
            BatchEntry::SettlementReminder(r) => r.render(),
            BatchEntry::Custom(email) => Notification {
                kind: NotificationKind::Custom,
                email,
            },
        }
    }
}

/// Wrap a notification in a queued send operation.
///
/// Provider rejections become reported failures carrying the provider body; any
/// other mailer error is raised.
pub fn queue_notification<M: Mailer>(
    mailer: Arc<M>,
    notification: Notification,
) -> QueuedEmail<Notification> {
    let email = notification.email.clone();

    QueuedEmail::new(notification.email.to.clone(), notification, move || {
        let mailer = Arc::clone(&mailer);
        let email = email.clone();
        async move {
            match mailer.send(&email).await {
                Ok(()) => Ok(SendOutcome::sent()),
                Err(MailerError::Api { body, .. }) => Ok(SendOutcome::failed(body)),
                Err(e) => Err(e.into()),
            }
        }
    })
}

/// Send a batch of notifications through the rate-limited queue.
pub async fn send_batched_emails<M: Mailer>(
    mailer: Arc<M>,
    notifications: Vec<Notification>,
    config: DispatchConfig,
) -> QueueResult {
    info!(count = notifications.len(), "notification_batch_queued");

    let batch = notifications
        .into_iter()
        .map(|n| queue_notification(Arc::clone(&mailer), n))
        .collect();

    send_emails_with_rate_limit(batch, config).await
}
