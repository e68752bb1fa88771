//! PayUp mailer - rate-limited notification email dispatch.
//!
//! This library provides:
//! - `queue`: sequential dispatch with pacing and per-email retries
//! - `transport`: the `Mailer` capability and a Resend HTTP client
//! - `notify`: PayUp notification templates and batch sending
//!
//! ## Architecture
//!
//! ```text
//! BatchEntry → Notification → QueuedEmail → RateLimitedQueue → Mailer → provider
//!                                                  ↓
//!                                             QueueResult
//! ```

pub mod config;
pub mod notify;
pub mod queue;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, DispatchConfig};
pub use notify::{send_batched_emails, BatchEntry, Notification, NotificationKind};
pub use queue::{
    send_emails_with_rate_limit, FailedEmail, QueueResult, QueuedEmail, RateLimitedQueue,
    SendOutcome, SharedDispatcher,
};
pub use transport::{Mailer, MailerError, OutgoingEmail, ResendMailer};
