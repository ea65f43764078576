//! Anthropic messages client. Unlike the chat-completions shape, the system
//! message is a top-level field rather than a message role.

use super::{classify_status, classify_transport, malformed_body, LlmClient};
use crate::errors::InvokeError;
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde_json::json;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.1;

pub struct AnthropicClient {
    model: String,
    api_key: String,
    http: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<LlmResponse, InvokeError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "system": system_message,
            "messages": [
                { "role": "user", "content": user_message },
            ],
        });

        let resp = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport("anthropic", &e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_status("anthropic", status.as_u16(), &text));
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| classify_transport("anthropic", &e))?;

        let content = payload
            .pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| malformed_body("anthropic", "content[0].text"))?
            .to_string();
        let model = payload
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.model)
            .to_string();

        Ok(LlmResponse {
            content,
            provider: "anthropic".to_string(),
            model,
            meta: json!({
                "usage": payload.get("usage").cloned().unwrap_or(serde_json::Value::Null),
                "stop_reason": payload.get("stop_reason").cloned().unwrap_or(serde_json::Value::Null),
            }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}
