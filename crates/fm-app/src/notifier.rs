use std::time::Duration;
use async_trait::async_trait;
use tracing::{info, warn};
use fm_core::{CallbackPayload, Error, Result};

/// Destination for a job's terminal report.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Deliver `payload`. Failures are logged, never returned.
    async fn notify(&self, payload: &CallbackPayload);
}

/// Posts the report to the caller's callback URL, once, without retry.
pub struct CallbackNotifier {
    client: reqwest::Client,
    url: String,
}

impl CallbackNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn try_notify(&self, payload: &CallbackPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Callback to {} failed: {e}", self.url)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Network(format!("Callback returned HTTP {status}: {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl StatusSink for CallbackNotifier {
    async fn notify(&self, payload: &CallbackPayload) {
        match self.try_notify(payload).await {
            Ok(()) => info!(job = %payload.identifier, status = %payload.status, "Callback sent"),
            Err(e) => warn!(job = %payload.identifier, status = %payload.status, "Failed to notify caller: {e}"),
        }
    }
}
