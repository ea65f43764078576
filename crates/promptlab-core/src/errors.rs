//! Error taxonomy. Three tiers with different blast radii:
//! `EngineError` aborts a run before or after the fact, `StoreError`
//! surfaces persistence problems to the run caller, and `InvokeError` is a
//! classified per-trial failure that becomes data rather than propagating.

use crate::model::FailureKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid inputs or configuration. Fatal before any trial runs.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// A dispatcher worker died without producing an outcome. Worker panics
    /// are logic bugs and fail the run loudly.
    #[error("worker task failed: {0}")]
    Join(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique-trial constraint rejected a second write for a tuple that
    /// already has a record. The existing row is left untouched.
    #[error("duplicate result for ({prompt_id}, {case_id}, {model}) in run {run_id}")]
    Duplicate {
        run_id: String,
        prompt_id: String,
        case_id: String,
        model: String,
    },

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("store mutex poisoned")]
    Poisoned,

    #[error("snapshot encode failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Classified failure from a model invocation. Providers map every failure
/// mode onto one of the taxonomy kinds; nothing escapes unclassified.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct InvokeError {
    pub kind: FailureKind,
    pub detail: String,
}

impl InvokeError {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}
