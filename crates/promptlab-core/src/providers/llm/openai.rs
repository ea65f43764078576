//! OpenAI chat completions client.

use super::{classify_status, classify_transport, malformed_body, LlmClient};
use crate::errors::InvokeError;
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde_json::json;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Referential transparency is approximated with a low temperature so that
/// repeated runs over the same matrix stay comparable.
const TEMPERATURE: f32 = 0.1;

pub struct OpenAiClient {
    model: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<LlmResponse, InvokeError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_message },
                { "role": "user", "content": user_message },
            ],
            "temperature": TEMPERATURE,
        });

        let resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport("openai", &e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_status("openai", status.as_u16(), &text));
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| classify_transport("openai", &e))?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| malformed_body("openai", "choices[0].message.content"))?
            .to_string();
        let model = payload
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.model)
            .to_string();

        Ok(LlmResponse {
            content,
            provider: "openai".to_string(),
            model,
            meta: json!({
                "usage": payload.get("usage").cloned().unwrap_or(serde_json::Value::Null),
                "finish_reason": payload.pointer("/choices/0/finish_reason").cloned().unwrap_or(serde_json::Value::Null),
            }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
