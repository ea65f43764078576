//! Model provider clients. One implementation per vendor API behind the
//! `LlmClient` trait; selection happens once at configuration time, keyed
//! by model identifier, so no provider branching leaks into the dispatcher.

pub mod llm;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use llm::anthropic::AnthropicClient;
use llm::openai::OpenAiClient;
use llm::LlmClient;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Build one client per configured model. An identifier no provider claims
/// is a configuration error, raised before any run starts.
pub fn build_clients(
    cfg: &EngineConfig,
) -> Result<BTreeMap<String, Arc<dyn LlmClient>>, EngineError> {
    let mut clients: BTreeMap<String, Arc<dyn LlmClient>> = BTreeMap::new();
    for entry in &cfg.models {
        clients.insert(entry.name.clone(), select_client(&entry.name, &entry.api_key)?);
    }
    Ok(clients)
}

fn select_client(model: &str, api_key: &str) -> Result<Arc<dyn LlmClient>, EngineError> {
    let name = api_model_name(model);
    let lower = model.to_ascii_lowercase();
    if lower.starts_with("openai/") || lower.contains("gpt") {
        return Ok(Arc::new(OpenAiClient::new(name.to_string(), api_key.to_string())));
    }
    if lower.starts_with("anthropic/") || lower.contains("claude") {
        return Ok(Arc::new(AnthropicClient::new(name.to_string(), api_key.to_string())));
    }
    Err(EngineError::Config(format!(
        "no provider recognizes model '{model}'"
    )))
}

/// Model identifiers may carry a `provider/` routing prefix; the API itself
/// only sees the bare name.
fn api_model_name(model: &str) -> &str {
    model.split_once('/').map_or(model, |(_, bare)| bare)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelEntry;

    fn config_for(names: &[&str]) -> EngineConfig {
        EngineConfig {
            models: names
                .iter()
                .map(|n| ModelEntry {
                    name: n.to_string(),
                    api_key: "test-key".into(),
                })
                .collect(),
            max_concurrent_requests: 2,
            request_delay_seconds: 0.0,
            request_timeout_seconds: 5,
            sequential: false,
        }
    }

    #[test]
    fn routes_by_model_identifier() {
        let clients =
            build_clients(&config_for(&["gpt-4o-mini", "claude-sonnet-4-5", "openai/gpt-4.1"]))
                .expect("all models recognized");
        assert_eq!(clients["gpt-4o-mini"].provider_name(), "openai");
        assert_eq!(clients["claude-sonnet-4-5"].provider_name(), "anthropic");
        assert_eq!(clients["openai/gpt-4.1"].provider_name(), "openai");
    }

    #[test]
    fn unknown_model_is_a_configuration_error() {
        let err = build_clients(&config_for(&["llama-3-70b"])).err().expect("unrouted model");
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn routing_prefix_is_stripped_from_the_api_name() {
        assert_eq!(api_model_name("openai/gpt-4.1"), "gpt-4.1");
        assert_eq!(api_model_name("gpt-4o-mini"), "gpt-4o-mini");
    }
}
