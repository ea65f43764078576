//! The dispatcher: drives every trial in the matrix to exactly one recorded
//! outcome, under the governor's concurrency and pacing limits.
//!
//! Issue loop and worker pool follow the permit-then-spawn pattern: a
//! governor permit is acquired before a worker is spawned into the
//! `JoinSet` and travels with it, so the in-flight bound covers the whole
//! invocation lifetime. With a limit of 1 this degenerates to sequential,
//! issue-order execution.

use crate::config::EngineConfig;
use crate::engine::governor::Governor;
use crate::engine::matrix::expand_matrix;
use crate::errors::{EngineError, InvokeError, StoreError};
use crate::model::{CaseSpec, FailureKind, LlmResponse, PromptSpec, RunSnapshot, TrialSpec, TrialStatus};
use crate::providers::llm::LlmClient;
use crate::report::progress::{ProgressEvent, ProgressSink};
use crate::report::{RunArtifacts, RunCounts};
use crate::storage::rows::ResultRow;
use crate::storage::Store;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Cooperative cancellation signal. Once raised, the runner stops issuing
/// new trials; in-flight invocations finish naturally and are recorded, and
/// the run is finalized with partial counts.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Maximum simultaneous invocations.
    pub concurrency_limit: usize,
    /// Minimum spacing between invocation starts. Zero disables pacing.
    pub pacing_interval: Duration,
    /// Per-invocation deadline; an overrun is recorded as a timeout failure.
    pub request_timeout: Duration,
    /// Forces a concurrency limit of 1 and issue-order completion.
    pub sequential: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            pacing_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            sequential: false,
        }
    }
}

impl RunSettings {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            concurrency_limit: cfg.max_concurrent_requests,
            pacing_interval: cfg.pacing_interval(),
            request_timeout: cfg.request_timeout(),
            sequential: cfg.sequential,
        }
    }

    pub fn effective_limit(&self) -> usize {
        if self.sequential {
            1
        } else {
            self.concurrency_limit.max(1)
        }
    }
}

/// Owns one run end to end. Holds no persistent state itself; all durable
/// state goes through the store. Dropped when the run caller is done.
pub struct Runner {
    pub store: Store,
    pub clients: BTreeMap<String, Arc<dyn LlmClient>>,
    pub settings: RunSettings,
    pub progress: Option<ProgressSink>,
    pub cancel: CancelFlag,
}

impl Runner {
    /// Execute the full matrix. Returns the run id and aggregate counts.
    /// Trial failures become recorded data; only configuration and storage
    /// errors abort.
    pub async fn run(
        &self,
        prompts: &[PromptSpec],
        cases: &[CaseSpec],
        models: &[String],
    ) -> Result<RunArtifacts, EngineError> {
        let trials = expand_matrix(prompts, cases, models)?;
        for model in models {
            if !self.clients.contains_key(model) {
                return Err(EngineError::Config(format!(
                    "no client configured for model '{model}'"
                )));
            }
        }

        let snapshot = RunSnapshot {
            models: models.to_vec(),
            concurrency_limit: self.settings.effective_limit(),
            pacing_seconds: self.settings.pacing_interval.as_secs_f64(),
            sequential: self.settings.sequential,
            prompts: prompts.len(),
            cases: cases.len(),
        };
        let total = trials.len();
        let run_id = self.store.create_run(&snapshot, total as u64)?;
        info!(run_id = %run_id, trials = total, limit = self.settings.effective_limit(), "starting run");

        let governor = Governor::new(self.settings.effective_limit(), self.settings.pacing_interval);
        let mut workers = JoinSet::new();
        let mut issued: u64 = 0;

        for spec in trials {
            if self.cancel.is_cancelled() {
                break;
            }
            let permit = governor.acquire().await;
            // Re-check after the (possibly long) wait for capacity, so a
            // cancellation raised by an in-flight trial stops the next one.
            if self.cancel.is_cancelled() {
                drop(permit);
                break;
            }

            let client = Arc::clone(&self.clients[&spec.model]);
            let store = self.store.clone();
            let run_id = run_id.clone();
            let deadline = self.settings.request_timeout;
            issued += 1;
            workers.spawn(async move {
                let _permit = permit;
                run_trial(&store, client.as_ref(), &run_id, &spec, deadline).await
            });
        }

        if self.cancel.is_cancelled() {
            warn!(run_id = %run_id, issued, total, "cancelled; waiting for in-flight trials");
        }

        let mut counts = RunCounts {
            attempted: issued,
            ..RunCounts::default()
        };
        let mut abort: Option<EngineError> = None;
        let mut done = 0usize;
        while let Some(joined) = workers.join_next().await {
            done += 1;
            match joined {
                Ok(Ok(status)) => counts.record(status),
                Ok(Err(store_err)) => {
                    if abort.is_none() {
                        abort = Some(EngineError::Storage(store_err));
                    }
                }
                Err(join_err) => {
                    if abort.is_none() {
                        abort = Some(EngineError::Join(join_err.to_string()));
                    }
                }
            }
            if let Some(sink) = &self.progress {
                sink(ProgressEvent { done, total });
            }
        }

        if let Some(err) = abort {
            // The dataset is incomplete; mark the run failed and surface the
            // first error rather than masking it.
            let _ = self.store.finalize_run(&run_id, "failed", counts.succeeded);
            return Err(err);
        }

        let cancelled = self.cancel.is_cancelled();
        let state = if cancelled { "cancelled" } else { "completed" };
        self.store.finalize_run(&run_id, state, counts.succeeded)?;
        info!(
            run_id = %run_id,
            succeeded = counts.succeeded,
            failed = counts.failed_total(),
            state,
            "run finished"
        );

        Ok(RunArtifacts {
            run_id,
            counts,
            cancelled,
        })
    }
}

/// One trial: invoke, classify, record. Invocation failures are absorbed
/// into the result row; only a storage failure propagates.
async fn run_trial(
    store: &Store,
    client: &dyn LlmClient,
    run_id: &str,
    spec: &TrialSpec,
    deadline: Duration,
) -> Result<TrialStatus, StoreError> {
    let row = match invoke_with_deadline(client, spec, deadline).await {
        Ok(response) => ResultRow::success(run_id, spec, &response),
        Err(err) => {
            debug!(model = %spec.model, prompt = %spec.prompt.id, case = %spec.case.id, kind = %err.kind, "trial failed: {err}");
            ResultRow::failure(run_id, spec, &err)
        }
    };
    store.insert_result(&row)?;
    Ok(row.status)
}

async fn invoke_with_deadline(
    client: &dyn LlmClient,
    spec: &TrialSpec,
    deadline: Duration,
) -> Result<LlmResponse, InvokeError> {
    match timeout(deadline, client.complete(spec.system_message(), spec.user_message())).await {
        Ok(outcome) => outcome,
        Err(_) => Err(InvokeError::new(
            FailureKind::Timeout,
            format!("no response from {} within {:?}", spec.model, deadline),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InvokeError;
    use crate::providers::llm::fake::FakeClient;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::AtomicUsize;

    fn prompts(ids: &[&str]) -> Vec<PromptSpec> {
        ids.iter().map(|id| PromptSpec::new(*id, format!("system {id}"))).collect()
    }

    fn cases(ids: &[&str]) -> Vec<CaseSpec> {
        ids.iter().map(|id| CaseSpec::new(*id, format!("user {id}"))).collect()
    }

    fn models(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn quick_settings(limit: usize, sequential: bool) -> RunSettings {
        RunSettings {
            concurrency_limit: limit,
            pacing_interval: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
            sequential,
        }
    }

    fn runner_with(
        clients: BTreeMap<String, Arc<dyn LlmClient>>,
        settings: RunSettings,
    ) -> Runner {
        Runner {
            store: Store::memory().expect("in-memory store"),
            clients,
            settings,
            progress: None,
            cancel: CancelFlag::new(),
        }
    }

    fn fake_clients(model_ids: &[&str]) -> BTreeMap<String, Arc<dyn LlmClient>> {
        model_ids
            .iter()
            .map(|id| {
                let client: Arc<dyn LlmClient> = Arc::new(FakeClient::new(*id));
                (id.to_string(), client)
            })
            .collect()
    }

    fn record_set(store: &Store, run_id: &str) -> BTreeSet<(String, String, String, String)> {
        store
            .results_for_run(run_id, None)
            .expect("read results")
            .into_iter()
            .map(|r| (r.prompt_id, r.case_id, r.model, r.status.as_str().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn success_scenario_records_one_row_per_trial() {
        let runner = runner_with(fake_clients(&["m1"]), quick_settings(4, false));
        let artifacts = runner
            .run(&prompts(&["A", "B"]), &cases(&["X"]), &models(&["m1"]))
            .await
            .expect("run completes");

        assert_eq!(artifacts.counts.attempted, 2);
        assert_eq!(artifacts.counts.succeeded, 2);
        assert_eq!(artifacts.counts.failed_total(), 0);
        assert!(!artifacts.cancelled);

        let rows = runner
            .store
            .results_for_run(&artifacts.run_id, None)
            .expect("read results");
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row.status.is_success());
            assert!(row.response_content.is_some());
            assert!(row.error_detail.is_none());
        }
    }

    #[tokio::test]
    async fn all_failures_still_yield_a_complete_run() {
        let mut clients: BTreeMap<String, Arc<dyn LlmClient>> = BTreeMap::new();
        clients.insert(
            "m1".into(),
            Arc::new(FakeClient::new("m1").failing_with(FailureKind::RateLimited)),
        );
        let runner = runner_with(clients, quick_settings(4, false));
        let artifacts = runner
            .run(&prompts(&["A", "B"]), &cases(&["X"]), &models(&["m1"]))
            .await
            .expect("run completes despite failures");

        assert_eq!(artifacts.counts.attempted, 2);
        assert_eq!(artifacts.counts.succeeded, 0);
        assert_eq!(artifacts.counts.failed[&FailureKind::RateLimited], 2);

        let rows = runner
            .store
            .results_for_run(&artifacts.run_id, None)
            .expect("read results");
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.status, TrialStatus::Failure(FailureKind::RateLimited));
            assert!(row.response_content.is_none());
            assert!(row.error_detail.is_some());
        }
    }

    #[tokio::test]
    async fn concurrent_and_sequential_modes_produce_identical_record_sets() {
        let p = prompts(&["p1", "p2", "p3"]);
        let c = cases(&["c1", "c2"]);
        let m = models(&["m1", "m2"]);

        let mut clients = fake_clients(&["m1"]);
        clients.insert(
            "m2".into(),
            Arc::new(FakeClient::new("m2").failing_with(FailureKind::ProviderError)),
        );

        let concurrent = runner_with(clients.clone(), quick_settings(6, false));
        let sequential = runner_with(clients, quick_settings(6, true));

        let a = concurrent.run(&p, &c, &m).await.expect("concurrent run");
        let b = sequential.run(&p, &c, &m).await.expect("sequential run");

        assert_eq!(a.counts.attempted, 12);
        assert_eq!(b.counts.attempted, 12);
        assert_eq!(
            record_set(&concurrent.store, &a.run_id),
            record_set(&sequential.store, &b.run_id)
        );
    }

    #[tokio::test]
    async fn unknown_model_aborts_before_any_record() {
        let runner = runner_with(fake_clients(&["m1"]), quick_settings(2, false));
        let err = runner
            .run(&prompts(&["A"]), &cases(&["X"]), &models(&["m1", "ghost"]))
            .await
            .expect_err("unknown model must abort");
        assert!(matches!(err, EngineError::Config(_)));
        assert!(runner.store.list_runs().expect("list runs").is_empty());
    }

    #[tokio::test]
    async fn empty_prompt_list_aborts_before_any_record() {
        let runner = runner_with(fake_clients(&["m1"]), quick_settings(2, false));
        let err = runner
            .run(&[], &cases(&["X"]), &models(&["m1"]))
            .await
            .expect_err("empty prompts must abort");
        assert!(matches!(err, EngineError::Config(_)));
        assert!(runner.store.list_runs().expect("list runs").is_empty());
    }

    /// Client that raises the shared cancel flag from inside its first call.
    struct CancellingClient {
        flag: CancelFlag,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for CancellingClient {
        async fn complete(
            &self,
            _system_message: &str,
            _user_message: &str,
        ) -> Result<LlmResponse, InvokeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.flag.cancel();
            Ok(LlmResponse {
                content: "done".into(),
                provider: "fake".into(),
                model: "m1".into(),
                meta: serde_json::json!({}),
            })
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }
    }

    #[tokio::test]
    async fn cancellation_stops_issuing_and_returns_partial_counts() {
        let cancel = CancelFlag::new();
        let mut clients: BTreeMap<String, Arc<dyn LlmClient>> = BTreeMap::new();
        clients.insert(
            "m1".into(),
            Arc::new(CancellingClient {
                flag: cancel.clone(),
                calls: AtomicUsize::new(0),
            }),
        );
        let mut runner = runner_with(clients, quick_settings(1, true));
        runner.cancel = cancel;

        let artifacts = runner
            .run(&prompts(&["A", "B", "C"]), &cases(&["X"]), &models(&["m1"]))
            .await
            .expect("cancelled run still finalizes");

        assert!(artifacts.cancelled);
        assert_eq!(artifacts.counts.attempted, 1);
        assert_eq!(artifacts.counts.succeeded, 1);
        assert_eq!(
            runner
                .store
                .results_for_run(&artifacts.run_id, None)
                .expect("read results")
                .len(),
            1
        );
        let run = runner
            .store
            .run_row(&artifacts.run_id)
            .expect("run row exists");
        assert_eq!(run.status, "cancelled");
    }

    #[tokio::test]
    async fn pre_raised_cancellation_yields_zero_trials() {
        let mut runner = runner_with(fake_clients(&["m1"]), quick_settings(2, false));
        runner.cancel.cancel();

        let artifacts = runner
            .run(&prompts(&["A", "B"]), &cases(&["X"]), &models(&["m1"]))
            .await
            .expect("run finalizes");
        assert!(artifacts.cancelled);
        assert_eq!(artifacts.counts.attempted, 0);
        assert_eq!(artifacts.counts.recorded(), 0);
    }

    /// Client that tracks how many calls are in flight at once.
    struct InstrumentedClient {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for InstrumentedClient {
        async fn complete(
            &self,
            _system_message: &str,
            _user_message: &str,
        ) -> Result<LlmResponse, InvokeError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(LlmResponse {
                content: "ok".into(),
                provider: "fake".into(),
                model: "m1".into(),
                meta: serde_json::json!({}),
            })
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn dispatch_respects_the_concurrency_limit() {
        let client = Arc::new(InstrumentedClient {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let mut clients: BTreeMap<String, Arc<dyn LlmClient>> = BTreeMap::new();
        clients.insert("m1".into(), client.clone());
        let runner = runner_with(clients, quick_settings(2, false));

        runner
            .run(
                &prompts(&["p1", "p2", "p3", "p4"]),
                &cases(&["c1", "c2"]),
                &models(&["m1"]),
            )
            .await
            .expect("run completes");

        let peak = client.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak in-flight invocations was {peak}");
    }

    #[tokio::test]
    async fn slow_client_is_recorded_as_timeout() {
        let mut clients: BTreeMap<String, Arc<dyn LlmClient>> = BTreeMap::new();
        clients.insert(
            "m1".into(),
            Arc::new(FakeClient::new("m1").with_latency(Duration::from_secs(60))),
        );
        let settings = RunSettings {
            request_timeout: Duration::from_millis(20),
            ..quick_settings(1, false)
        };
        let runner = runner_with(clients, settings);

        let artifacts = runner
            .run(&prompts(&["A"]), &cases(&["X"]), &models(&["m1"]))
            .await
            .expect("run completes");
        assert_eq!(artifacts.counts.failed[&FailureKind::Timeout], 1);
    }
}
