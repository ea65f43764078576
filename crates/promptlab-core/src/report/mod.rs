pub mod progress;

use crate::model::{FailureKind, TrialStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate outcome counts for one run. `attempted` counts issued trials;
/// under cancellation it can be smaller than the matrix size.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: BTreeMap<FailureKind, u64>,
}

impl RunCounts {
    pub fn record(&mut self, status: TrialStatus) {
        match status {
            TrialStatus::Success => self.succeeded += 1,
            TrialStatus::Failure(kind) => *self.failed.entry(kind).or_insert(0) += 1,
        }
    }

    pub fn failed_total(&self) -> u64 {
        self.failed.values().sum()
    }

    pub fn recorded(&self) -> u64 {
        self.succeeded + self.failed_total()
    }
}

/// What a completed run hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunArtifacts {
    pub run_id: String,
    pub counts: RunCounts,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_kind() {
        let mut counts = RunCounts::default();
        counts.record(TrialStatus::Success);
        counts.record(TrialStatus::Failure(FailureKind::Timeout));
        counts.record(TrialStatus::Failure(FailureKind::Timeout));
        counts.record(TrialStatus::Failure(FailureKind::ProviderError));

        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.failed[&FailureKind::Timeout], 2);
        assert_eq!(counts.failed[&FailureKind::ProviderError], 1);
        assert_eq!(counts.failed_total(), 3);
        assert_eq!(counts.recorded(), 4);
    }
}
