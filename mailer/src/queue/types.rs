//! Dispatch queue types.
//!
//! This module defines:
//! - `QueuedEmail`: one unit of work wrapping an opaque send operation
//! - `SendOutcome`: what a send operation reports back
//! - `QueueResult`: the aggregate report returned for a batch

use std::fmt;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message recorded when a failure carries no error detail at all.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// A zero-argument asynchronous send operation.
///
/// Returning `Err` is treated the same as reporting `SendOutcome { success: false, .. }`,
/// with the error itself captured as the failure detail.
pub type SendFn = Box<dyn FnMut() -> BoxFuture<'static, anyhow::Result<SendOutcome>> + Send>;

// =============================================================================
// Queued Email
// =============================================================================

/// One email waiting to be dispatched.
///
/// `data` is carried for the caller's convenience; the queue never looks at it.
pub struct QueuedEmail<T> {
    /// Recipient address, used for reporting and log correlation only
    pub recipient_email: String,
    /// Operation that performs a single send attempt
    pub send: SendFn,
    /// Caller payload
    pub data: T,
}

impl<T> QueuedEmail<T> {
    /// Create a queued email from a closure producing a send future.
    pub fn new<F, Fut>(recipient_email: impl Into<String>, data: T, mut send: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = anyhow::Result<SendOutcome>> + Send + 'static,
    {
        Self {
            recipient_email: recipient_email.into(),
            send: Box::new(move || send().boxed()),
            data,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueuedEmail<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedEmail")
            .field("recipient_email", &self.recipient_email)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Send Outcome
// =============================================================================

/// Result reported by a single send attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    /// Opaque error detail, typically the provider's error body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl SendOutcome {
    /// A successful send.
    pub fn sent() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed send carrying the given error detail.
    pub fn failed(error: impl Into<Value>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Queue Result
// =============================================================================

/// A single exhausted email in the batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEmail {
    pub email: String,
    pub error: String,
}

/// Aggregate report for one batch.
///
/// `successful + failed == total` and `errors.len() == failed` always hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// One entry per failed email, in processing order
    pub errors: Vec<FailedEmail>,
}

impl QueueResult {
    pub(crate) fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub(crate) fn record_success(&mut self) {
        self.successful += 1;
    }

    pub(crate) fn record_failure(&mut self, email: String, error: String) {
        self.failed += 1;
        self.errors.push(FailedEmail { email, error });
    }

    /// True when every email in the batch was delivered.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

// =============================================================================
// Attempt Errors
// =============================================================================

/// The failure observed on one attempt, in whichever form it arrived.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// Send operation resolved with `success: false`
    Reported(Option<Value>),
    /// Send operation resolved with `Err`
    Raised(anyhow::Error),
    /// Send operation panicked
    Panicked(String),
}

impl AttemptError {
    /// Text inspected for rate-limit markers.
    pub(crate) fn signal_text(&self) -> String {
        match self {
            AttemptError::Reported(Some(Value::String(s))) => s.clone(),
            AttemptError::Reported(Some(value)) => value.to_string(),
            AttemptError::Reported(None) => String::new(),
            AttemptError::Raised(e) => format!("{:#}", e),
            AttemptError::Panicked(msg) => msg.clone(),
        }
    }

    /// Message recorded in the batch report.
    pub(crate) fn message(&self) -> String {
        match self {
            AttemptError::Reported(Some(Value::String(s))) => s.clone(),
            AttemptError::Reported(Some(value)) => value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            AttemptError::Reported(None) => UNKNOWN_ERROR.to_string(),
            AttemptError::Raised(e) => e.to_string(),
            AttemptError::Panicked(msg) => msg.clone(),
        }
    }
}
