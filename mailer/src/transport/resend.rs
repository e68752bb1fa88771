//! Resend HTTP API client.
//!
//! Sends one email per `POST /emails` call. A non-2xx response becomes
//! `MailerError::Api` carrying the provider's JSON error body, so throttling
//! (`statusCode: 429`) stays visible to the dispatch queue.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

use super::{Mailer, MailerError, OutgoingEmail};
use crate::config::Config;

/// Request body for `POST /emails`.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

/// Success body for `POST /emails`.
#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Resend-backed mailer.
#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    endpoint: Url,
    api_key: String,
    from: String,
}

impl ResendMailer {
    /// Create a mailer for the given API base URL.
    ///
    /// `timeout` bounds each request, which is what keeps a hung provider from
    /// stalling a batch forever.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MailerError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MailerError::MissingApiKey);
        }

        // Url::join replaces the last segment unless the base ends with '/'.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)?.join("emails")?;

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from: from.into(),
        })
    }

    /// Create a mailer from application configuration.
    pub fn from_config(config: &Config) -> Result<Self, MailerError> {
        let api_key = config
            .resend_api_key
            .clone()
            .ok_or(MailerError::MissingApiKey)?;

        Self::new(
            &config.resend_api_url,
            api_key,
            config.mail_from.clone(),
            config.request_timeout(),
        )
    }

    /// Full URL emails are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let request = SendRequest {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
            text: email.text.as_deref(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let id = response.json::<SendResponse>().await.ok().map(|r| r.id);
            info!(
                to = %email.to,
                status_code = status.as_u16(),
                provider_id = ?id,
                "resend_email_accepted"
            );
            return Ok(());
        }

        let raw = response.text().await.unwrap_or_default();
        let mut body = serde_json::from_str::<Value>(&raw)
            .unwrap_or_else(|_| json!({ "statusCode": status.as_u16(), "message": raw }));

        if let Value::Object(fields) = &mut body {
            fields
                .entry("statusCode")
                .or_insert_with(|| json!(status.as_u16()));
        }

        let err = MailerError::Api {
            status: status.as_u16(),
            body,
        };

        if err.is_rate_limited() {
            warn!(to = %email.to, error = %err, "resend_email_throttled");
        } else {
            warn!(to = %email.to, error = %err, "resend_email_rejected");
        }

        Err(err)
    }
}
