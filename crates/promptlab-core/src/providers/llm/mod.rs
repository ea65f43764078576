pub mod anthropic;
pub mod fake;
pub mod openai;

use crate::errors::InvokeError;
use crate::model::{FailureKind, LlmResponse};
use async_trait::async_trait;

/// A language-model backend: maps a rendered (system, user) message pair to
/// a response. Callable many times concurrently. Every failure mode maps to
/// an `InvokeError` with a taxonomy kind; implementations must not let
/// anything else escape.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<LlmResponse, InvokeError>;

    fn provider_name(&self) -> &'static str;
}

/// Shared HTTP status classification for provider clients.
pub(crate) fn classify_status(provider: &str, status: u16, body: &str) -> InvokeError {
    let kind = match status {
        401 | 403 => FailureKind::AuthenticationError,
        429 => FailureKind::RateLimited,
        400 | 404 | 422 => FailureKind::InvalidRequest,
        500..=599 => FailureKind::ProviderError,
        _ => FailureKind::UnknownError,
    };
    InvokeError::new(
        kind,
        format!("{provider}: http {status}: {}", truncate(body, 300)),
    )
}

/// Transport-level failures: the client's own timeout, refused connections,
/// protocol errors.
pub(crate) fn classify_transport(provider: &str, err: &reqwest::Error) -> InvokeError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() {
        FailureKind::ProviderError
    } else {
        FailureKind::UnknownError
    };
    InvokeError::new(kind, format!("{provider}: {err}"))
}

pub(crate) fn malformed_body(provider: &str, what: &str) -> InvokeError {
    InvokeError::new(
        FailureKind::ProviderError,
        format!("{provider}: response missing {what}"),
    )
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_onto_the_failure_taxonomy() {
        let table = [
            (401, FailureKind::AuthenticationError),
            (403, FailureKind::AuthenticationError),
            (429, FailureKind::RateLimited),
            (400, FailureKind::InvalidRequest),
            (404, FailureKind::InvalidRequest),
            (422, FailureKind::InvalidRequest),
            (500, FailureKind::ProviderError),
            (503, FailureKind::ProviderError),
            (418, FailureKind::UnknownError),
        ];
        for (status, expected) in table {
            let err = classify_status("openai", status, "body");
            assert_eq!(err.kind, expected, "status {status}");
        }
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(5000);
        let err = classify_status("openai", 500, &body);
        assert!(err.detail.len() < 500);
    }
}
