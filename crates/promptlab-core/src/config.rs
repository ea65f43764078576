//! Engine configuration, loaded from a JSON file.
//!
//! ```json
//! {
//!   "models": [{ "name": "gpt-4o-mini", "api_key": "sk-..." }],
//!   "max_concurrent_requests": 5,
//!   "request_delay_seconds": 1.0,
//!   "request_timeout_seconds": 30
//! }
//! ```

use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub models: Vec<ModelEntry>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_request_delay")]
    pub request_delay_seconds: f64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Forces a concurrency limit of 1 and issue-order completion.
    #[serde(default)]
    pub sequential: bool,
}

fn default_max_concurrent() -> usize {
    5
}

fn default_request_delay() -> f64 {
    1.0
}

fn default_request_timeout() -> u64 {
    30
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let cfg: Self = serde_json::from_str(&raw).map_err(|e| {
            EngineError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.models.is_empty() {
            return Err(EngineError::Config(
                "no models configured; at least one model entry is required".into(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(EngineError::Config(
                "max_concurrent_requests must be at least 1".into(),
            ));
        }
        if !self.request_delay_seconds.is_finite() || self.request_delay_seconds < 0.0 {
            return Err(EngineError::Config(
                "request_delay_seconds must be a non-negative number".into(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(EngineError::Config(
                "request_timeout_seconds must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<EngineConfig, EngineError> {
        let cfg: EngineConfig = serde_json::from_str(json).expect("valid json");
        cfg.validate().map(|()| cfg)
    }

    #[test]
    fn defaults_apply_when_fields_omitted() {
        let cfg = parse(r#"{ "models": [{ "name": "gpt-4o-mini" }] }"#).expect("valid config");
        assert_eq!(cfg.max_concurrent_requests, 5);
        assert_eq!(cfg.request_delay_seconds, 1.0);
        assert_eq!(cfg.request_timeout_seconds, 30);
        assert!(!cfg.sequential);
    }

    #[test]
    fn empty_model_list_is_rejected() {
        let err = parse(r#"{ "models": [] }"#).expect_err("must fail validation");
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = parse(
            r#"{ "models": [{ "name": "m" }], "max_concurrent_requests": 0 }"#,
        )
        .expect_err("must fail validation");
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let err = parse(
            r#"{ "models": [{ "name": "m" }], "request_delay_seconds": -0.5 }"#,
        )
        .expect_err("must fail validation");
        assert!(matches!(err, EngineError::Config(_)));
    }
}
