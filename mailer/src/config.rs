//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. Dispatch pacing defaults
//! keep outbound traffic under the email provider's 2 requests/second ceiling.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default pause after each processed email, in milliseconds.
pub const DEFAULT_DELAY_BETWEEN_EMAILS_MS: u64 = 600;

/// Default number of attempts per email.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default wait before each retry, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Pacing and retry policy for the dispatch queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Idle time enforced after each processed email (not after the last one)
    pub delay_between_emails: Duration,

    /// Maximum attempts per email before it is reported as failed
    pub max_retries: u32,

    /// Fixed wait inserted before each retry attempt
    pub retry_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delay_between_emails: Duration::from_millis(DEFAULT_DELAY_BETWEEN_EMAILS_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Milliseconds to wait between consecutive emails
    pub delay_between_emails_ms: u64,

    /// Maximum attempts per email
    pub max_retries: u32,

    /// Milliseconds to wait before each retry
    pub retry_delay_ms: u64,

    /// Resend API key; required only when actually sending
    pub resend_api_key: Option<String>,

    /// Base URL of the Resend HTTP API
    pub resend_api_url: String,

    /// Sender address used for every notification
    pub mail_from: String,

    /// Per-request HTTP timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            delay_between_emails_ms: parse_var(
                "EMAIL_DELAY_BETWEEN_MS",
                DEFAULT_DELAY_BETWEEN_EMAILS_MS,
            ),

            max_retries: parse_var("EMAIL_MAX_RETRIES", DEFAULT_MAX_RETRIES),

            retry_delay_ms: parse_var("EMAIL_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS),

            resend_api_key: env::var("RESEND_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            resend_api_url: env::var("RESEND_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com".to_string()),

            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "PayUp <notifications@payup.app>".to_string()),

            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS", 10_000),
        }
    }

    /// Dispatch policy derived from this configuration.
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            delay_between_emails: Duration::from_millis(self.delay_between_emails_ms),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// HTTP request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Parse a numeric environment variable, falling back to `default` when unset or malformed.
fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}
