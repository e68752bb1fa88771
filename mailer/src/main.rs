//! PayUp Mailer - send a batch of notification emails without tripping the
//! provider's rate limit.
//!
//! Usage: `payup-mailer <batch.json>`
//!
//! The batch file is a JSON array of entries tagged by `kind`
//! (`expense_added`, `settlement_reminder` or `custom`). The aggregate result is
//! printed to stdout as JSON. Individual delivery failures are reported there and
//! do not change the exit status.

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use payup::{send_batched_emails, BatchEntry, Config, Notification, ResendMailer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
        .init();

    info!("mailer_starting");

    let path = match env::args().nth(1) {
        Some(path) => path,
        None => bail!("usage: payup-mailer <batch.json>"),
    };

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        resend_api_key_set = config.resend_api_key.is_some(),
        resend_api_url = %config.resend_api_url,
        delay_between_ms = config.delay_between_emails_ms,
        max_retries = config.max_retries,
        retry_delay_ms = config.retry_delay_ms,
        "config_loaded"
    );

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read batch file {}", path))?;

    let entries: Vec<BatchEntry> =
        serde_json::from_str(&raw).context("Failed to parse batch file")?;

    let notifications: Vec<Notification> = entries
        .into_iter()
        .map(BatchEntry::into_notification)
        .collect();

    info!(path = %path, count = notifications.len(), "batch_loaded");

    let mailer = ResendMailer::from_config(&config).context("Failed to create mailer")?;
    info!(endpoint = %mailer.endpoint(), "mailer_ready");

    let result = send_batched_emails(Arc::new(mailer), notifications, config.dispatch()).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    );

    info!(
        total = result.total,
        successful = result.successful,
        failed = result.failed,
        all_succeeded = result.all_succeeded(),
        "mailer_finished"
    );

    Ok(())
}
