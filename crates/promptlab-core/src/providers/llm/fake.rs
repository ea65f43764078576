//! Scripted in-process client used by tests and dry runs. No network.

use super::LlmClient;
use crate::errors::InvokeError;
use crate::model::{FailureKind, LlmResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Duration;

pub struct FakeClient {
    model: String,
    response: String,
    failure: Option<FailureKind>,
    latency: Duration,
    calls: AtomicUsize,
}

impl FakeClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            response: "ok".to_string(),
            failure: None,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = response.into();
        self
    }

    /// Every call fails with the given kind.
    pub fn failing_with(mut self, kind: FailureKind) -> Self {
        self.failure = Some(kind);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(
        &self,
        _system_message: &str,
        _user_message: &str,
    ) -> Result<LlmResponse, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.failure {
            Some(kind) => Err(InvokeError::new(kind, format!("scripted {kind} failure"))),
            None => Ok(LlmResponse {
                content: self.response.clone(),
                provider: "fake".to_string(),
                model: self.model.clone(),
                meta: serde_json::json!({}),
            }),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
