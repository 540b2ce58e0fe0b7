//! The generation job runner.
//!
//! Drives one fully-resolved input mapping to completion: atomic credit
//! debit, provider submission, polling to a terminal state, result
//! extraction, and the history write. Errors never escape [`run_job`]
//! (`ItemRunner::run`); batch accounting only ever sees a boolean.
//! [`execute`](GenerationRunner::execute) exposes the distinct error
//! conditions for the single-job API boundary.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use fotogen_comfy::api::ComfyDeployError;
use fotogen_comfy::poller::{PollOutcome, RunPoller};
use fotogen_core::error::CoreError;
use fotogen_core::progress::JobStatus;
use fotogen_core::result_encoding::encode_result_urls;
use fotogen_core::types::DbId;
use fotogen_db::models::generation::CreateGeneration;
use fotogen_db::models::profile::DebitOutcome;
use fotogen_db::models::workflow::Workflow;
use fotogen_events::{
    EventBus, PlatformEvent, EVENT_CREDITS_CHANGED, EVENT_GENERATION_COMPLETED,
};

use crate::config::RunnerConfig;
use crate::provider::ComputeProvider;
use crate::store::{CreditLedger, GenerationStore};

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// One fully-resolved generation job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Owner of the job; the ledger debited and the history row written
    /// belong to this user.
    pub user_id: DbId,
    /// The workflow being executed.
    pub workflow: Workflow,
    /// Field name → resolved value. Image fields hold public URLs, never
    /// raw bytes.
    pub inputs: serde_json::Map<String, Value>,
    /// Shared batch id when this job is one item of a batch.
    pub batch_id: Option<Uuid>,
}

/// A successfully completed job.
#[derive(Debug, Clone)]
pub struct CompletedJob {
    /// History row id, when the insert succeeded.
    pub generation_id: Option<DbId>,
    /// Provider-assigned run identifier.
    pub run_id: String,
    /// Encoded result: bare URL or JSON-array string.
    pub result_image_url: String,
    /// Balance after the debit.
    pub remaining_credits: i64,
}

/// Ways a job can end without a result image.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The balance could not cover the workflow cost. Raised before any
    /// provider call; nothing was mutated.
    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: i64, available: i64 },

    /// The workflow's stored input configuration is unusable.
    #[error(transparent)]
    Config(CoreError),

    /// The submission request failed (including a missing run id).
    #[error("Provider submission failed: {0}")]
    Submission(#[from] ComfyDeployError),

    /// The provider reported the run failed.
    #[error("Provider reported run {run_id} failed")]
    ProviderFailed { run_id: String },

    /// The poll budget ran out before a terminal status.
    #[error("Run {run_id} timed out after {attempts} poll attempts")]
    TimedOut { run_id: String, attempts: u32 },

    /// The run succeeded but its outputs carried no image URL.
    #[error("Run {run_id} succeeded without a result image")]
    NoResultImage { run_id: String },

    /// The ledger could not be read or written.
    #[error("Ledger error: {0}")]
    Ledger(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// ItemRunner
// ---------------------------------------------------------------------------

/// Boolean-result job execution, the contract batch accounting relies on.
#[async_trait]
pub trait ItemRunner: Send + Sync {
    /// Run one job to a terminal state. True iff a result image was
    /// obtained; never panics or errors past this boundary.
    async fn run(&self, request: JobRequest) -> bool;
}

// ---------------------------------------------------------------------------
// GenerationRunner
// ---------------------------------------------------------------------------

/// Runs generation jobs against a compute provider.
pub struct GenerationRunner<P, S> {
    provider: Arc<P>,
    store: Arc<S>,
    events: Arc<EventBus>,
    poller: RunPoller,
}

impl<P, S> GenerationRunner<P, S>
where
    P: ComputeProvider,
    S: CreditLedger + GenerationStore,
{
    /// Create a runner with explicit configuration.
    pub fn new(
        provider: Arc<P>,
        store: Arc<S>,
        events: Arc<EventBus>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            provider,
            store,
            events,
            poller: RunPoller::new(config.poll_interval, config.max_poll_attempts),
        }
    }

    /// Execute one job, surfacing the distinct failure conditions.
    ///
    /// The debit happens immediately before submission and is compensated
    /// on any later failure, so every attempt nets exactly `cost` credits
    /// (success) or zero (anything else).
    pub async fn execute(&self, request: &JobRequest) -> Result<CompletedJob, RunnerError> {
        let workflow = &request.workflow;
        let inputs_config = workflow.parsed_inputs_config().map_err(RunnerError::Config)?;

        let input_image_url = inputs_config
            .primary_image_field()
            .and_then(|name| request.inputs.get(name))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        // The enforcement point: one conditional UPDATE, ahead of every
        // external call.
        let remaining = match self.store.try_debit(request.user_id, workflow.cost).await? {
            DebitOutcome::Debited { remaining } => remaining,
            DebitOutcome::InsufficientFunds { available } => {
                return Err(RunnerError::InsufficientCredits {
                    required: workflow.cost,
                    available,
                });
            }
        };
        self.publish_credits_changed(request.user_id, remaining);

        let inputs_value = Value::Object(request.inputs.clone());
        let run_id = match self
            .provider
            .queue_run(&workflow.external_id, &inputs_value)
            .await
        {
            Ok(run_id) => run_id,
            Err(e) => {
                self.refund(request.user_id, workflow.cost).await;
                return Err(RunnerError::Submission(e));
            }
        };

        tracing::info!(
            user_id = request.user_id,
            workflow_id = workflow.id,
            run_id = %run_id,
            batch_id = ?request.batch_id,
            "Generation run queued",
        );

        // The row exists from submission on so the provider callback can
        // match it by run id. Failing to write it does not fail the job.
        let generation_id = match self
            .store
            .insert(&CreateGeneration {
                user_id: request.user_id,
                workflow_id: workflow.id,
                run_id: Some(run_id.clone()),
                input_image_url,
                prompt_used: inputs_value,
                batch_id: request.batch_id,
            })
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Failed to insert generation row");
                None
            }
        };

        match self
            .poller
            .poll_until_terminal(self.provider.as_ref(), &run_id)
            .await
        {
            PollOutcome::Success { urls } if !urls.is_empty() => {
                let encoded = encode_result_urls(&urls);
                match self.store.complete(&run_id, &encoded).await {
                    Ok(true) => {}
                    Ok(false) => tracing::debug!(
                        run_id = %run_id,
                        "Generation row already terminal; callback won the race",
                    ),
                    Err(e) => tracing::error!(
                        run_id = %run_id,
                        error = %e,
                        "Failed to record generation result",
                    ),
                }

                let mut event = PlatformEvent::new(EVENT_GENERATION_COMPLETED)
                    .with_actor(request.user_id)
                    .with_payload(serde_json::json!({
                        "run_id": run_id,
                        "batch_id": request.batch_id,
                    }));
                if let Some(id) = generation_id {
                    event = event.with_source("generation", id);
                }
                self.events.publish(event);

                Ok(CompletedJob {
                    generation_id,
                    run_id,
                    result_image_url: encoded,
                    remaining_credits: remaining,
                })
            }
            PollOutcome::Success { .. } => {
                self.finish_unsuccessful(request, &run_id, JobStatus::Failed).await;
                Err(RunnerError::NoResultImage { run_id })
            }
            PollOutcome::Failed => {
                self.finish_unsuccessful(request, &run_id, JobStatus::Failed).await;
                Err(RunnerError::ProviderFailed { run_id })
            }
            PollOutcome::TimedOut { attempts } => {
                self.finish_unsuccessful(request, &run_id, JobStatus::TimedOut).await;
                Err(RunnerError::TimedOut { run_id, attempts })
            }
        }
    }

    /// Mark the row failed (best effort) and compensate the debit.
    ///
    /// `status` distinguishes a provider-reported failure from a poll
    /// timeout in the logs; both persist as a failed row.
    async fn finish_unsuccessful(&self, request: &JobRequest, run_id: &str, status: JobStatus) {
        tracing::warn!(
            run_id = %run_id,
            user_id = request.user_id,
            status = ?status,
            "Generation run unsuccessful",
        );
        match self.store.fail(run_id).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(
                run_id = %run_id,
                "Generation row already terminal; not marking failed",
            ),
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Failed to mark generation failed")
            }
        }
        self.refund(request.user_id, request.workflow.cost).await;
    }

    /// Compensating credit after an unsuccessful job.
    async fn refund(&self, user_id: DbId, amount: i64) {
        match self.store.credit(user_id, amount).await {
            Ok(remaining) => self.publish_credits_changed(user_id, remaining),
            Err(e) => tracing::error!(
                user_id,
                amount,
                error = %e,
                "Failed to refund credits after unsuccessful job",
            ),
        }
    }

    fn publish_credits_changed(&self, user_id: DbId, remaining: i64) {
        self.events.publish(
            PlatformEvent::new(EVENT_CREDITS_CHANGED)
                .with_actor(user_id)
                .with_payload(serde_json::json!({ "remaining": remaining })),
        );
    }
}

#[async_trait]
impl<P, S> ItemRunner for GenerationRunner<P, S>
where
    P: ComputeProvider + 'static,
    S: CreditLedger + GenerationStore + 'static,
{
    async fn run(&self, request: JobRequest) -> bool {
        match self.execute(&request).await {
            Ok(job) => {
                tracing::info!(
                    user_id = request.user_id,
                    run_id = %job.run_id,
                    "Generation job succeeded",
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    user_id = request.user_id,
                    workflow_id = request.workflow.id,
                    error = %e,
                    "Generation job failed",
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;
    use fotogen_comfy::api::RunDetails;
    use fotogen_comfy::poller::RunStatusSource;
    use tokio::sync::Mutex;

    use super::*;

    // -- Test doubles -------------------------------------------------------

    struct StubProvider {
        queue_response: Result<String, ()>,
        statuses: Vec<RunDetails>,
        queue_calls: AtomicU32,
        status_calls: AtomicU32,
    }

    impl StubProvider {
        fn succeeding(statuses: Vec<RunDetails>) -> Self {
            Self {
                queue_response: Ok("run-test".to_string()),
                statuses,
                queue_calls: AtomicU32::new(0),
                status_calls: AtomicU32::new(0),
            }
        }

        fn rejecting() -> Self {
            Self {
                queue_response: Err(()),
                statuses: vec![],
                queue_calls: AtomicU32::new(0),
                status_calls: AtomicU32::new(0),
            }
        }

        fn details(status: &str, outputs: serde_json::Value) -> RunDetails {
            serde_json::from_value(serde_json::json!({
                "status": status,
                "outputs": outputs,
            }))
            .unwrap()
        }
    }

    #[async_trait]
    impl RunStatusSource for StubProvider {
        async fn run_status(&self, _run_id: &str) -> Result<RunDetails, ComfyDeployError> {
            let i = self.status_calls.fetch_add(1, Ordering::SeqCst) as usize;
            let i = i.min(self.statuses.len() - 1);
            Ok(self.statuses[i].clone())
        }
    }

    #[async_trait]
    impl ComputeProvider for StubProvider {
        async fn queue_run(
            &self,
            _deployment_id: &str,
            _inputs: &Value,
        ) -> Result<String, ComfyDeployError> {
            self.queue_calls.fetch_add(1, Ordering::SeqCst);
            match &self.queue_response {
                Ok(run_id) => Ok(run_id.clone()),
                Err(()) => Err(ComfyDeployError::MissingRunId {
                    body: r#"{"error":"no capacity"}"#.to_string(),
                }),
            }
        }
    }

    #[derive(Debug, Clone)]
    struct StoredRow {
        run_id: Option<String>,
        status: String,
        result_image_url: Option<String>,
        batch_id: Option<Uuid>,
    }

    /// In-memory ledger + history store.
    struct MemoryStore {
        balance: Mutex<i64>,
        rows: Mutex<Vec<StoredRow>>,
    }

    impl MemoryStore {
        fn with_balance(balance: i64) -> Self {
            Self {
                balance: Mutex::new(balance),
                rows: Mutex::new(Vec::new()),
            }
        }

        async fn balance(&self) -> i64 {
            *self.balance.lock().await
        }

        async fn rows(&self) -> Vec<StoredRow> {
            self.rows.lock().await.clone()
        }
    }

    #[async_trait]
    impl CreditLedger for MemoryStore {
        async fn try_debit(
            &self,
            _user_id: DbId,
            amount: i64,
        ) -> Result<DebitOutcome, sqlx::Error> {
            let mut balance = self.balance.lock().await;
            if *balance >= amount {
                *balance -= amount;
                Ok(DebitOutcome::Debited { remaining: *balance })
            } else {
                Ok(DebitOutcome::InsufficientFunds { available: *balance })
            }
        }

        async fn credit(&self, _user_id: DbId, amount: i64) -> Result<i64, sqlx::Error> {
            let mut balance = self.balance.lock().await;
            *balance += amount;
            Ok(*balance)
        }
    }

    #[async_trait]
    impl GenerationStore for MemoryStore {
        async fn insert(&self, input: &CreateGeneration) -> Result<DbId, sqlx::Error> {
            let mut rows = self.rows.lock().await;
            rows.push(StoredRow {
                run_id: input.run_id.clone(),
                status: "processing".to_string(),
                result_image_url: None,
                batch_id: input.batch_id,
            });
            Ok(rows.len() as DbId)
        }

        async fn complete(
            &self,
            run_id: &str,
            result_image_url: &str,
        ) -> Result<bool, sqlx::Error> {
            let mut rows = self.rows.lock().await;
            for row in rows.iter_mut() {
                if row.run_id.as_deref() == Some(run_id) && row.status == "processing" {
                    row.status = "completed".to_string();
                    row.result_image_url = Some(result_image_url.to_string());
                    return Ok(true);
                }
            }
            Ok(false)
        }

        async fn fail(&self, run_id: &str) -> Result<bool, sqlx::Error> {
            let mut rows = self.rows.lock().await;
            for row in rows.iter_mut() {
                if row.run_id.as_deref() == Some(run_id) && row.status == "processing" {
                    row.status = "failed".to_string();
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }

    // -- Helpers ------------------------------------------------------------

    fn workflow(cost: i64) -> Workflow {
        Workflow {
            id: 1,
            title: "Product shot".to_string(),
            description: String::new(),
            cost,
            execution_type: "comfy".to_string(),
            external_id: "dep-123".to_string(),
            inputs_config: serde_json::json!({
                "inputs": [
                    { "name": "prompt", "type": "text", "label": "Prompt" },
                    { "name": "photo", "type": "image", "label": "Photo" }
                ]
            }),
            created_at: chrono::Utc::now(),
        }
    }

    fn request(cost: i64) -> JobRequest {
        let mut inputs = serde_json::Map::new();
        inputs.insert("prompt".to_string(), Value::from("a soda can"));
        inputs.insert(
            "photo".to_string(),
            Value::from("https://cdn/input.png"),
        );
        JobRequest {
            user_id: 7,
            workflow: workflow(cost),
            inputs,
            batch_id: None,
        }
    }

    fn runner(
        provider: Arc<StubProvider>,
        store: Arc<MemoryStore>,
    ) -> GenerationRunner<StubProvider, MemoryStore> {
        GenerationRunner::new(
            provider,
            store,
            Arc::new(EventBus::default()),
            RunnerConfig {
                poll_interval: Duration::from_millis(1),
                max_poll_attempts: 5,
            },
        )
    }

    // -- Scenarios ----------------------------------------------------------

    #[tokio::test]
    async fn happy_path_single_image_debits_and_records() {
        let provider = Arc::new(StubProvider::succeeding(vec![
            StubProvider::details("running", serde_json::json!([])),
            StubProvider::details(
                "success",
                serde_json::json!([{ "data": { "images": [{ "url": "https://cdn/out.png" }] } }]),
            ),
        ]));
        let store = Arc::new(MemoryStore::with_balance(10));

        let job = runner(Arc::clone(&provider), Arc::clone(&store))
            .execute(&request(5))
            .await
            .unwrap();

        assert_eq!(job.result_image_url, "https://cdn/out.png");
        assert_eq!(job.remaining_credits, 5);
        assert_eq!(store.balance().await, 5);

        let rows = store.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "completed");
        assert_eq!(
            rows[0].result_image_url.as_deref(),
            Some("https://cdn/out.png")
        );
    }

    #[tokio::test]
    async fn insufficient_funds_rejects_before_any_provider_call() {
        let provider = Arc::new(StubProvider::succeeding(vec![StubProvider::details(
            "success",
            serde_json::json!([]),
        )]));
        let store = Arc::new(MemoryStore::with_balance(3));

        let err = runner(Arc::clone(&provider), Arc::clone(&store))
            .execute(&request(5))
            .await
            .unwrap_err();

        assert_matches!(
            err,
            RunnerError::InsufficientCredits { required: 5, available: 3 }
        );
        assert_eq!(provider.queue_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.balance().await, 3);
        assert!(store.rows().await.is_empty());
    }

    #[tokio::test]
    async fn multi_image_result_is_stored_as_json_array() {
        let provider = Arc::new(StubProvider::succeeding(vec![StubProvider::details(
            "success",
            serde_json::json!([{ "data": { "images": [
                { "url": "a" }, { "url": "b" }
            ] } }]),
        )]));
        let store = Arc::new(MemoryStore::with_balance(10));

        let job = runner(provider, Arc::clone(&store))
            .execute(&request(5))
            .await
            .unwrap();

        assert_eq!(job.result_image_url, r#"["a","b"]"#);
        let rows = store.rows().await;
        assert_eq!(rows[0].result_image_url.as_deref(), Some(r#"["a","b"]"#));
    }

    #[tokio::test]
    async fn missing_run_id_refunds_and_writes_no_row() {
        let provider = Arc::new(StubProvider::rejecting());
        let store = Arc::new(MemoryStore::with_balance(10));
        let run = runner(Arc::clone(&provider), Arc::clone(&store));

        let err = run.execute(&request(5)).await.unwrap_err();
        assert_matches!(err, RunnerError::Submission(ComfyDeployError::MissingRunId { ref body })
            if body.contains("no capacity"));

        // Debit compensated, nothing persisted.
        assert_eq!(store.balance().await, 10);
        assert!(store.rows().await.is_empty());

        // The boolean boundary swallows the error.
        assert!(!run.run(request(5)).await);
    }

    #[tokio::test]
    async fn provider_failure_marks_row_failed_and_refunds() {
        let provider = Arc::new(StubProvider::succeeding(vec![StubProvider::details(
            "failed",
            serde_json::json!([]),
        )]));
        let store = Arc::new(MemoryStore::with_balance(10));

        let err = runner(provider, Arc::clone(&store))
            .execute(&request(5))
            .await
            .unwrap_err();

        assert_matches!(err, RunnerError::ProviderFailed { .. });
        assert_eq!(store.balance().await, 10);
        assert_eq!(store.rows().await[0].status, "failed");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_ends_job_after_exact_budget() {
        let provider = Arc::new(StubProvider::succeeding(vec![StubProvider::details(
            "running",
            serde_json::json!([]),
        )]));
        let store = Arc::new(MemoryStore::with_balance(10));
        let run = GenerationRunner::new(
            Arc::clone(&provider),
            Arc::clone(&store),
            Arc::new(EventBus::default()),
            RunnerConfig {
                poll_interval: Duration::from_secs(2),
                max_poll_attempts: 7,
            },
        );

        let err = run.execute(&request(5)).await.unwrap_err();
        assert_matches!(err, RunnerError::TimedOut { attempts: 7, .. });
        assert_eq!(provider.status_calls.load(Ordering::SeqCst), 7);
        assert_eq!(store.balance().await, 10);
        assert_eq!(store.rows().await[0].status, "failed");
    }

    #[tokio::test]
    async fn success_without_images_is_a_failure() {
        let provider = Arc::new(StubProvider::succeeding(vec![StubProvider::details(
            "success",
            serde_json::json!([]),
        )]));
        let store = Arc::new(MemoryStore::with_balance(10));

        let err = runner(provider, Arc::clone(&store))
            .execute(&request(5))
            .await
            .unwrap_err();

        assert_matches!(err, RunnerError::NoResultImage { .. });
        assert_eq!(store.balance().await, 10);
    }
}
