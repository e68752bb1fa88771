//! Email transport abstraction.
//!
//! The dispatch queue never talks to a provider directly; it only runs send
//! operations. This module supplies the `Mailer` capability those operations call,
//! plus a Resend HTTP implementation.

pub mod resend;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use resend::ResendMailer;

/// A fully rendered email ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Optional plain-text alternative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Error type for email sending operations.
#[derive(Debug, Error)]
pub enum MailerError {
    /// Provider answered with a non-success status.
    #[error("{status} {body}")]
    Api { status: u16, body: Value },

    /// Request never produced a response (connect, timeout, TLS).
    #[error("email transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// No API key configured.
    #[error("email provider API key is not configured")]
    MissingApiKey,

    /// Provider base URL could not be parsed.
    #[error("invalid email provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl MailerError {
    /// True for provider throttling responses.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, MailerError::Api { status: 429, .. })
    }
}

/// Trait for async delivery of a single email.
///
/// Implementations perform exactly one provider call per invocation; retry and
/// pacing belong to the dispatch queue.
pub trait Mailer: Send + Sync + 'static {
    /// Send one email.
    fn send(&self, email: &OutgoingEmail) -> impl Future<Output = Result<(), MailerError>> + Send;
}
