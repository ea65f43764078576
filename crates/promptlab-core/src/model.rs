//! Value types shared across the engine: trial specs, statuses, and the
//! provider response shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A prompt under test: identifier plus the rendered system message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    pub id: String,
    pub content: String,
}

impl PromptSpec {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// A test case: identifier plus the rendered user message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSpec {
    pub id: String,
    pub content: String,
}

impl CaseSpec {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// One point in the experiment matrix: (prompt, case, model). Pure value,
/// generated once per run; the input to exactly one result row.
#[derive(Debug, Clone)]
pub struct TrialSpec {
    pub prompt: PromptSpec,
    pub case: CaseSpec,
    pub model: String,
}

impl TrialSpec {
    pub fn system_message(&self) -> &str {
        &self.prompt.content
    }

    pub fn user_message(&self) -> &str {
        &self.case.content
    }
}

/// Classified trial failure. Produced at the provider boundary, consumed by
/// the dispatcher; every kind is recorded, none is fatal to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    RateLimited,
    AuthenticationError,
    InvalidRequest,
    ProviderError,
    UnknownError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::AuthenticationError => "authentication_error",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::ProviderError => "provider_error",
            FailureKind::UnknownError => "unknown_error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(FailureKind::Timeout),
            "rate_limited" => Some(FailureKind::RateLimited),
            "authentication_error" => Some(FailureKind::AuthenticationError),
            "invalid_request" => Some(FailureKind::InvalidRequest),
            "provider_error" => Some(FailureKind::ProviderError),
            "unknown_error" => Some(FailureKind::UnknownError),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one trial as persisted in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStatus {
    Success,
    Failure(FailureKind),
}

impl TrialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialStatus::Success => "success",
            TrialStatus::Failure(kind) => kind.as_str(),
        }
    }

    /// Inverse of `as_str`. Unrecognized column values map to
    /// `unknown_error` rather than failing the read path.
    pub fn parse(s: &str) -> Self {
        if s == "success" {
            TrialStatus::Success
        } else {
            TrialStatus::Failure(FailureKind::parse(s).unwrap_or(FailureKind::UnknownError))
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TrialStatus::Success)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TrialStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Structured response from a model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    /// Model name reported by the API, which may differ from the configured
    /// identifier (e.g. a dated snapshot alias).
    pub model: String,
    /// Provider extras (usage, finish reason); free-form.
    pub meta: serde_json::Value,
}

/// Configuration snapshot persisted on the run row at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub models: Vec<String>,
    pub concurrency_limit: usize,
    pub pacing_seconds: f64,
    pub sequential: bool,
    pub prompts: usize,
    pub cases: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_column_text() {
        let statuses = [
            TrialStatus::Success,
            TrialStatus::Failure(FailureKind::Timeout),
            TrialStatus::Failure(FailureKind::RateLimited),
            TrialStatus::Failure(FailureKind::AuthenticationError),
            TrialStatus::Failure(FailureKind::InvalidRequest),
            TrialStatus::Failure(FailureKind::ProviderError),
            TrialStatus::Failure(FailureKind::UnknownError),
        ];
        for s in statuses {
            assert_eq!(TrialStatus::parse(s.as_str()), s);
        }
    }

    #[test]
    fn unknown_status_text_degrades_to_unknown_error() {
        assert_eq!(
            TrialStatus::parse("network_error"),
            TrialStatus::Failure(FailureKind::UnknownError)
        );
    }
}
