//! Cross-batch serialization for the dispatch queue.
//!
//! `RateLimitedQueue` only paces emails within one batch. When several tasks dispatch
//! against the same provider account, wrap the queue in a `SharedDispatcher` so batches
//! run one after another and the pacing gap also holds across batch boundaries.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::dispatcher::RateLimitedQueue;
use super::types::{QueueResult, QueuedEmail};
use crate::config::DispatchConfig;

/// Clonable handle that runs batches one at a time.
#[derive(Clone)]
pub struct SharedDispatcher {
    inner: Arc<SharedInner>,
}

struct SharedInner {
    queue: RateLimitedQueue,
    /// When the previous batch finished; guarded so only one batch runs at a time
    last_finished: Mutex<Option<Instant>>,
}

impl SharedDispatcher {
    /// Create a shared dispatcher with the given policy.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                queue: RateLimitedQueue::new(config),
                last_finished: Mutex::new(None),
            }),
        }
    }

    /// The effective policy.
    pub fn config(&self) -> &DispatchConfig {
        self.inner.queue.config()
    }

    /// Dispatch a batch once every earlier batch has finished.
    ///
    /// Waits so that at least `delay_between_emails` separates the end of the previous
    /// batch from this batch's first send. The end time is recorded even when the
    /// returned future is dropped partway through.
    pub async fn dispatch<T>(&self, batch: Vec<QueuedEmail<T>>) -> QueueResult {
        let last_finished = self.inner.last_finished.lock().await;

        if let Some(finished) = *last_finished {
            let ready_at = finished + self.config().delay_between_emails;
            let now = Instant::now();
            if now < ready_at {
                debug!(wait = ?(ready_at - now), "email_batch_waiting_for_gap");
                sleep_until(ready_at).await;
            }
        }

        let _finish = FinishStamp { last_finished };

        self.inner.queue.dispatch(batch).await
    }
}

/// Records the batch end time on drop, whether the batch completed or was cancelled.
struct FinishStamp<'a> {
    last_finished: MutexGuard<'a, Option<Instant>>,
}

impl Drop for FinishStamp<'_> {
    fn drop(&mut self) {
        *self.last_finished = Some(Instant::now());
    }
}
