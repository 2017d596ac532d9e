//! Per-contact message delivery.
//!
//! [`NotificationDispatcher::send`] delivers one text to one phone number.
//! Each send is independent: the coordinator fans out one call per contact
//! and a failure for one contact never affects the others.  There is no
//! delivery-receipt tracking.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::NotifyConfig;

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("message request failed: {0}")]
    Request(String),

    #[error("gateway rejected message (HTTP {status})")]
    Rejected { status: u16 },

    #[error("invalid phone number: {0:?}")]
    InvalidNumber(String),
}

impl From<reqwest::Error> for DispatchError {
    fn from(e: reqwest::Error) -> Self {
        DispatchError::Request(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// NotificationDispatcher trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, phone_number: &str, text: &str) -> Result<(), DispatchError>;
}

fn check_number(phone_number: &str) -> Result<(), DispatchError> {
    let digits = phone_number.chars().filter(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return Err(DispatchError::InvalidNumber(phone_number.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// WebhookDispatcher
// ---------------------------------------------------------------------------

/// POSTs `{ "to": <number>, "body": <text> }` to an SMS gateway.
///
/// The `Authorization: Bearer …` header is attached only when
/// `config.api_key` is a non-empty string.
pub struct WebhookDispatcher {
    client: reqwest::Client,
    config: NotifyConfig,
}

impl WebhookDispatcher {
    pub fn from_config(config: &NotifyConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn send(&self, phone_number: &str, text: &str) -> Result<(), DispatchError> {
        check_number(phone_number)?;

        let body = serde_json::json!({
            "to":   phone_number,
            "body": text,
        });

        let mut req = self.client.post(&self.config.url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LogDispatcher
// ---------------------------------------------------------------------------

/// Dry-run transport: writes each message to the log instead of sending it.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, phone_number: &str, text: &str) -> Result<(), DispatchError> {
        check_number(phone_number)?;
        log::info!("notify (dry run) → {phone_number}: {text:?}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
