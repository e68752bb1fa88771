//! Queue module for rate-limited email dispatch.
//!
//! This module provides:
//! - Work item and report types
//! - A sequential dispatcher that paces and retries sends
//! - A shared handle that serializes batches from concurrent callers
//!
//! ## Flow
//!
//! ```text
//! [QueuedEmail...] → RateLimitedQueue::dispatch → one send at a time → QueueResult
//! ```

pub mod dispatcher;
pub mod shared;
pub mod types;

pub use dispatcher::{is_rate_limited, send_emails_with_rate_limit, RateLimitedQueue};
pub use shared::SharedDispatcher;
pub use types::{FailedEmail, QueueResult, QueuedEmail, SendFn, SendOutcome, UNKNOWN_ERROR};
