//! Row shapes for the results database.

use crate::errors::InvokeError;
use crate::model::{LlmResponse, TrialSpec, TrialStatus};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

/// One immutable experiment result. Exactly one per (run, prompt, case,
/// model); write-once, append-only.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRow {
    pub run_id: String,
    pub prompt_id: String,
    pub case_id: String,
    pub model: String,
    pub system_message: String,
    pub user_message: String,
    pub response_content: Option<String>,
    pub status: TrialStatus,
    pub error_detail: Option<String>,
    pub created_at: String,
}

impl ResultRow {
    pub fn success(run_id: &str, spec: &TrialSpec, response: &LlmResponse) -> Self {
        Self {
            run_id: run_id.to_string(),
            prompt_id: spec.prompt.id.clone(),
            case_id: spec.case.id.clone(),
            model: spec.model.clone(),
            system_message: spec.prompt.content.clone(),
            user_message: spec.case.content.clone(),
            response_content: Some(response.content.clone()),
            status: TrialStatus::Success,
            error_detail: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn failure(run_id: &str, spec: &TrialSpec, err: &InvokeError) -> Self {
        Self {
            run_id: run_id.to_string(),
            prompt_id: spec.prompt.id.clone(),
            case_id: spec.case.id.clone(),
            model: spec.model.clone(),
            system_message: spec.prompt.content.clone(),
            user_message: spec.case.content.clone(),
            response_content: None,
            status: TrialStatus::Failure(err.kind),
            error_detail: Some(err.detail.clone()),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// One run row: identity, lifecycle state, and the configuration snapshot
/// taken at start.
#[derive(Debug, Clone, Serialize)]
pub struct RunRow {
    pub id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub config_json: Option<String>,
    pub total_trials: u64,
    pub succeeded: Option<u64>,
}

/// Read-path aggregate for one run: the run row plus per-status counts.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run: RunRow,
    pub recorded: u64,
    pub by_status: BTreeMap<String, u64>,
}
