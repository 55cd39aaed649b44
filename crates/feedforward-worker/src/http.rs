use async_trait::async_trait;
use std::time::Duration;

use feedforward_core::models::TaskPayload;

use crate::dispatcher::{DispatchError, TaskDispatcher};

/// Hands tasks to an external durable dispatcher, which calls back the
/// task endpoint with the same payload (possibly more than once).
#[derive(Clone)]
pub struct HttpTaskDispatcher {
    client: reqwest::Client,
    target_url: String,
}

impl HttpTaskDispatcher {
    pub fn new(target_url: impl Into<String>) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            target_url: target_url.into(),
        })
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }
}

#[async_trait]
impl TaskDispatcher for HttpTaskDispatcher {
    #[tracing::instrument(skip(self), fields(request_id = %payload.request_id))]
    async fn enqueue(&self, payload: TaskPayload) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.target_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Task dispatcher rejected task");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(target_url = %self.target_url, "Task handed to external dispatcher");
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}
