//! Rate-limited sequential dispatch.
//!
//! Emails are sent strictly one at a time, in batch order. After every email except
//! the last the queue idles for `delay_between_emails`, which keeps throughput under
//! the provider ceiling without a concurrent limiter. Each email gets up to
//! `max_retries` attempts with a fixed `retry_delay` between them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::types::{AttemptError, QueueResult, QueuedEmail, SendFn, SendOutcome};
use crate::config::DispatchConfig;

/// Markers that identify a throttling response in an error's text.
const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate"];

/// Returns true when the error text looks like a provider rate-limit response.
///
/// The check is a plain case-sensitive substring match.
pub fn is_rate_limited(error_text: &str) -> bool {
    RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| error_text.contains(marker))
}

/// Sequential dispatch queue with fixed inter-email delay and per-email retries.
#[derive(Debug, Clone)]
pub struct RateLimitedQueue {
    config: DispatchConfig,
}

impl RateLimitedQueue {
    /// Create a queue with the given policy.
    ///
    /// A `max_retries` of zero is raised to one so every email is attempted.
    pub fn new(mut config: DispatchConfig) -> Self {
        if config.max_retries == 0 {
            warn!(
                configured = config.max_retries,
                effective = 1,
                "dispatch_max_retries_coerced"
            );
            config.max_retries = 1;
        }
        Self { config }
    }

    /// The effective policy.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Send every email in the batch and report the outcome.
    ///
    /// Never fails: per-email errors, returned or raised, are retried and then folded
    /// into the returned `QueueResult`. A send operation that never completes stalls the
    /// batch; callers needing deadlines must put a timeout inside the send operation.
    pub async fn dispatch<T>(&self, batch: Vec<QueuedEmail<T>>) -> QueueResult {
        let total = batch.len();
        let mut result = QueueResult::with_total(total);

        info!(
            total = total,
            delay_between = ?self.config.delay_between_emails,
            max_retries = self.config.max_retries,
            retry_delay = ?self.config.retry_delay,
            "email_batch_started"
        );

        for (index, mut item) in batch.into_iter().enumerate() {
            let position = index + 1;

            match self.deliver(&mut item, position, total).await {
                Ok(attempts) => {
                    info!(
                        email = %item.recipient_email,
                        position = position,
                        total = total,
                        attempts = attempts,
                        "email_sent"
                    );
                    result.record_success();
                }
                Err(last_error) => {
                    let message = last_error.message();
                    error!(
                        email = %item.recipient_email,
                        position = position,
                        total = total,
                        attempts = self.config.max_retries,
                        error = %message,
                        "email_send_failed"
                    );
                    result.record_failure(item.recipient_email, message);
                }
            }

            if position < total {
                sleep(self.config.delay_between_emails).await;
            }
        }

        info!(
            total = result.total,
            successful = result.successful,
            failed = result.failed,
            "email_batch_complete"
        );

        result
    }

    /// Run the attempt loop for one email.
    ///
    /// Returns the number of attempts used on success, or the last observed error once
    /// every attempt has failed.
    async fn deliver<T>(
        &self,
        item: &mut QueuedEmail<T>,
        position: usize,
        total: usize,
    ) -> Result<u32, AttemptError> {
        let max_retries = self.config.max_retries;
        let mut last_error = AttemptError::Reported(None);

        for attempt in 1..=max_retries {
            let err = match attempt_send(&mut item.send).await {
                Ok(()) => return Ok(attempt),
                Err(err) => err,
            };

            // Rate-limit waits apply even after the final attempt.
            if is_rate_limited(&err.signal_text()) {
                warn!(
                    email = %item.recipient_email,
                    position = position,
                    total = total,
                    attempt = attempt,
                    retry_delay = ?self.config.retry_delay,
                    "email_rate_limited"
                );
                sleep(self.config.retry_delay).await;
            } else if attempt < max_retries {
                debug!(
                    email = %item.recipient_email,
                    attempt = attempt,
                    error = %err.message(),
                    retry_delay = ?self.config.retry_delay,
                    "email_retry_scheduled"
                );
                sleep(self.config.retry_delay).await;
            }

            last_error = err;
        }

        Err(last_error)
    }
}

impl Default for RateLimitedQueue {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

/// Dispatch a batch with the given policy.
pub async fn send_emails_with_rate_limit<T>(
    batch: Vec<QueuedEmail<T>>,
    config: DispatchConfig,
) -> QueueResult {
    RateLimitedQueue::new(config).dispatch(batch).await
}

/// Invoke a send operation once, catching returned failures, errors and panics.
async fn attempt_send(send: &mut SendFn) -> Result<(), AttemptError> {
    let future = match panic::catch_unwind(AssertUnwindSafe(|| send())) {
        Ok(future) => future,
        Err(payload) => return Err(AttemptError::Panicked(panic_message(payload))),
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(SendOutcome { success: true, .. })) => Ok(()),
        Ok(Ok(SendOutcome { error, .. })) => Err(AttemptError::Reported(error)),
        Ok(Err(e)) => Err(AttemptError::Raised(e)),
        Err(payload) => Err(AttemptError::Panicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "send operation panicked".to_string()
    }
}
