//! Dispatcher implementations for the server binary.
//!
//! The webhook dispatcher POSTs each notification as JSON to a configured
//! URL; the log dispatcher writes it to the log and never fails. Delivery
//! is best-effort either way — a failure is reported to the caller and not
//! retried here.

use std::time::Duration;

use postern_core::dispatch::{Dispatcher, Notification};
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("webhook delivery failed: {0}")]
  Delivery(#[from] reqwest::Error),

  #[error("webhook answered {0}")]
  Status(reqwest::StatusCode),
}

/// The notification channel selected from configuration.
#[derive(Clone)]
pub enum ServerDispatcher {
  Webhook { client: Client, url: String },
  Log,
}

impl ServerDispatcher {
  pub fn webhook(url: String) -> Result<Self, DispatchError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(DispatchError::Client)?;
    Ok(Self::Webhook { client, url })
  }

  pub fn log() -> Self {
    Self::Log
  }
}

impl Dispatcher for ServerDispatcher {
  type Error = DispatchError;

  async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
    match self {
      Self::Webhook { client, url } => {
        let response = client.post(url).json(&notification).send().await?;
        if !response.status().is_success() {
          return Err(DispatchError::Status(response.status()));
        }
        Ok(())
      }
      Self::Log => {
        tracing::info!(
          audience = ?notification.audience,
          subject = %notification.subject_label,
          body = %notification.body,
          "notification"
        );
        Ok(())
      }
    }
  }
}
