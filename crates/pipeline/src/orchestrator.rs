//! The batch orchestrator.
//!
//! Turns one user submission — possibly carrying N files on the workflow's
//! batch field — into N independent job-runner invocations under a bounded
//! worker pool, sharing one batch id, uploaded static assets, and a live
//! progress feed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use fotogen_cloud::{ObjectStore, StorageError};
use fotogen_core::error::CoreError;
use fotogen_core::naming;
use fotogen_core::progress::{BatchOutcome, BatchProgress};
use fotogen_core::types::DbId;
use fotogen_core::validation::validate_required_inputs;
use fotogen_db::models::workflow::Workflow;
use fotogen_events::{EventBus, PlatformEvent, EVENT_BATCH_FINISHED};

use crate::config::OrchestratorConfig;
use crate::runner::{ItemRunner, JobRequest};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// One uploaded file from the submission form.
#[derive(Debug, Clone)]
pub struct FileInput {
    /// Original client-side filename.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// One user submission, before any upload or job has run.
#[derive(Debug)]
pub struct BatchRequest {
    /// Batch identifier shared by every item. Minted by the caller so it
    /// can be handed back before the batch finishes.
    pub batch_id: Uuid,
    /// Submitting user; owns every job of the batch.
    pub user_id: DbId,
    /// The workflow being executed.
    pub workflow: Workflow,
    /// Form field values (text/select/number, plus preset-supplied URLs).
    pub form_values: serde_json::Map<String, Value>,
    /// Newly provided files per image field.
    pub files: HashMap<String, Vec<FileInput>>,
    /// Apply the sequential-rename convention to batch-field uploads.
    pub sequential_rename: bool,
}

/// Ways a submission can be rejected before any job starts.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// A required field is missing or the workflow config is unusable.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// A shared (static) asset upload failed; every job depends on it, so
    /// the whole submission aborts.
    #[error("Upload failed for '{label}'")]
    StaticUploadFailed {
        /// Label of the offending field.
        label: String,
        #[source]
        source: StorageError,
    },
}

/// Per-batch context shared by the worker pool.
struct ItemContext {
    user_id: DbId,
    workflow: Workflow,
    /// Form values with static upload URLs already merged in.
    resolved_values: serde_json::Map<String, Value>,
    batch_field: Option<String>,
    batch_files: Vec<FileInput>,
    sequential_rename: bool,
    brand: Option<String>,
    batch_id: Uuid,
    total: usize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

// ---------------------------------------------------------------------------
// BatchOrchestrator
// ---------------------------------------------------------------------------

/// Fans one submission out into jobs under a fixed-size worker pool.
pub struct BatchOrchestrator<R: ItemRunner> {
    runner: Arc<R>,
    store: Arc<dyn ObjectStore>,
    events: Arc<EventBus>,
    config: OrchestratorConfig,
}

impl<R: ItemRunner> BatchOrchestrator<R> {
    /// Create an orchestrator with explicit configuration.
    pub fn new(
        runner: Arc<R>,
        store: Arc<dyn ObjectStore>,
        events: Arc<EventBus>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            runner,
            store,
            events,
            config,
        }
    }

    /// Run one submission to completion.
    ///
    /// Validation and static-asset uploads happen up front and abort the
    /// whole submission on failure. After that, per-item failures only
    /// count against that item; the remaining workers keep draining the
    /// queue. Progress snapshots go out through `progress` as items finish.
    pub async fn run_batch(
        &self,
        request: BatchRequest,
        progress: &watch::Sender<BatchProgress>,
    ) -> Result<BatchOutcome, OrchestratorError> {
        let inputs_config = request.workflow.parsed_inputs_config()?;
        inputs_config.validate()?;

        let mut files = request.files;
        validate_required_inputs(&inputs_config, &request.form_values, |name| {
            files.get(name).is_some_and(|list| !list.is_empty())
        })?;

        let batch_field = inputs_config.batch_field().map(|f| f.name.clone());
        let batch_files: Vec<FileInput> = batch_field
            .as_ref()
            .and_then(|name| files.remove(name))
            .unwrap_or_default();
        let total = batch_files.len().max(1);

        // Static assets upload once and their URLs are shared by all items.
        let mut resolved_values = request.form_values;
        for field in inputs_config.static_image_fields() {
            let Some(file) = files.get(&field.name).and_then(|list| list.first()) else {
                continue;
            };
            let object_name = naming::static_object_name(
                chrono::Utc::now().timestamp_millis(),
                &naming::random_token(),
                &file.filename,
            );
            let url = self
                .store
                .put(&object_name, file.bytes.clone(), true)
                .await
                .map_err(|source| OrchestratorError::StaticUploadFailed {
                    label: field.label.clone(),
                    source,
                })?;
            resolved_values.insert(field.name.clone(), Value::String(url));
        }

        let brand = {
            let pairs: Vec<(&str, &str)> = resolved_values
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
                .collect();
            naming::detect_brand_value(pairs).map(str::to_string)
        };

        let batch_id = request.batch_id;
        tracing::info!(
            batch_id = %batch_id,
            workflow_id = request.workflow.id,
            user_id = request.user_id,
            total,
            "Batch submission started",
        );

        let context = ItemContext {
            user_id: request.user_id,
            workflow: request.workflow,
            resolved_values,
            batch_field,
            batch_files,
            sequential_rename: request.sequential_rename,
            brand,
            batch_id,
            total,
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        };

        let _ = progress.send(BatchProgress {
            total,
            succeeded: 0,
            failed: 0,
        });

        // Shared work queue. The pop happens under the lock, so no two
        // workers can claim the same index even on a preemptive runtime.
        let queue: Mutex<VecDeque<usize>> = Mutex::new((0..total).collect());

        let worker_count = self.config.concurrency.min(total).max(1);
        let workers =
            (0..worker_count).map(|_| self.drain_queue(&context, &queue, progress));
        futures::future::join_all(workers).await;

        let outcome = BatchOutcome {
            batch_id,
            total,
            succeeded: context.succeeded.load(Ordering::SeqCst),
            failed: context.failed.load(Ordering::SeqCst),
        };

        self.events.publish(
            PlatformEvent::new(EVENT_BATCH_FINISHED)
                .with_actor(context.user_id)
                .with_payload(serde_json::json!({
                    "batch_id": outcome.batch_id,
                    "succeeded": outcome.succeeded,
                    "failed": outcome.failed,
                })),
        );

        if outcome.is_clean() {
            tracing::info!(batch_id = %batch_id, total, "Batch finished clean");
        } else {
            tracing::warn!(
                batch_id = %batch_id,
                failed = outcome.failed,
                total,
                "Batch finished with errors",
            );
        }

        Ok(outcome)
    }

    /// One worker: claim indices until the queue is empty.
    async fn drain_queue(
        &self,
        context: &ItemContext,
        queue: &Mutex<VecDeque<usize>>,
        progress: &watch::Sender<BatchProgress>,
    ) {
        loop {
            let index = { queue.lock().await.pop_front() };
            let Some(index) = index else { break };

            let ok = self.process_item(context, index).await;
            if ok {
                context.succeeded.fetch_add(1, Ordering::SeqCst);
            } else {
                context.failed.fetch_add(1, Ordering::SeqCst);
            }

            let _ = progress.send(BatchProgress {
                total: context.total,
                succeeded: context.succeeded.load(Ordering::SeqCst),
                failed: context.failed.load(Ordering::SeqCst),
            });
        }
    }

    /// Upload this item's batch file (if any) and run its job.
    async fn process_item(&self, context: &ItemContext, index: usize) -> bool {
        let mut inputs = context.resolved_values.clone();

        if let (Some(field_name), Some(file)) =
            (&context.batch_field, context.batch_files.get(index))
        {
            let token = naming::random_token();
            let object_name = match (&context.brand, context.sequential_rename) {
                (Some(brand), true) => naming::sequential_object_name(
                    brand,
                    index,
                    &token,
                    naming::file_extension(&file.filename),
                ),
                _ => naming::batch_object_name(
                    chrono::Utc::now().timestamp_millis(),
                    &token,
                    &file.filename,
                ),
            };

            match self.store.put(&object_name, file.bytes.clone(), true).await {
                Ok(url) => {
                    inputs.insert(field_name.clone(), Value::String(url));
                }
                Err(e) => {
                    tracing::warn!(
                        batch_id = %context.batch_id,
                        index,
                        error = %e,
                        "Batch item upload failed",
                    );
                    return false;
                }
            }
        }

        self.runner
            .run(JobRequest {
                user_id: context.user_id,
                workflow: context.workflow.clone(),
                inputs,
                batch_id: Some(context.batch_id),
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use fotogen_cloud::MemoryObjectStore;
    use tokio::sync::Mutex as AsyncMutex;

    use super::*;

    // -- Test doubles -------------------------------------------------------

    /// Runner that records every request and fails when the batch-field
    /// URL contains a marker substring.
    struct StubRunner {
        requests: AsyncMutex<Vec<JobRequest>>,
        fail_on: Option<String>,
        current: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl StubRunner {
        fn new() -> Self {
            Self {
                requests: AsyncMutex::new(Vec::new()),
                fail_on: None,
                current: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
            }
        }

        fn failing_on(marker: &str) -> Self {
            Self {
                fail_on: Some(marker.to_string()),
                ..Self::new()
            }
        }

        async fn requests(&self) -> Vec<JobRequest> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl ItemRunner for StubRunner {
        async fn run(&self, request: JobRequest) -> bool {
            let in_flight = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(in_flight, Ordering::SeqCst);

            // Hold the slot briefly so overlap is observable.
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;

            let ok = match &self.fail_on {
                Some(marker) => !serde_json::to_string(&request.inputs)
                    .unwrap_or_default()
                    .contains(marker.as_str()),
                None => true,
            };

            self.requests.lock().await.push(request);
            self.current.fetch_sub(1, Ordering::SeqCst);
            ok
        }
    }

    /// Store whose writes fail when the object name contains a marker.
    struct FlakyStore {
        inner: MemoryObjectStore,
        fail_on: String,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn put(
            &self,
            name: &str,
            bytes: Vec<u8>,
            allow_overwrite: bool,
        ) -> Result<String, StorageError> {
            if name.contains(self.fail_on.as_str()) {
                return Err(StorageError::Upload {
                    name: name.to_string(),
                    message: "simulated outage".to_string(),
                });
            }
            self.inner.put(name, bytes, allow_overwrite).await
        }

        fn public_url(&self, name: &str) -> String {
            self.inner.public_url(name)
        }
    }

    // -- Helpers ------------------------------------------------------------

    fn workflow() -> Workflow {
        Workflow {
            id: 1,
            title: "Product shot".to_string(),
            description: String::new(),
            cost: 5,
            execution_type: "comfy".to_string(),
            external_id: "dep-123".to_string(),
            inputs_config: serde_json::json!({
                "inputs": [
                    { "name": "brand_name", "type": "text", "label": "Brand", "required": true },
                    { "name": "logo", "type": "image", "label": "Logo" },
                    { "name": "photos", "type": "image", "label": "Photos", "multiple": true }
                ]
            }),
            created_at: chrono::Utc::now(),
        }
    }

    fn form_values() -> serde_json::Map<String, Value> {
        let mut values = serde_json::Map::new();
        values.insert("brand_name".to_string(), Value::from("Acme"));
        values
    }

    fn batch_files(count: usize) -> Vec<FileInput> {
        (0..count)
            .map(|i| FileInput {
                filename: format!("img-{i}.png"),
                bytes: vec![i as u8],
            })
            .collect()
    }

    fn request_with(files: HashMap<String, Vec<FileInput>>, rename: bool) -> BatchRequest {
        BatchRequest {
            batch_id: Uuid::new_v4(),
            user_id: 7,
            workflow: workflow(),
            form_values: form_values(),
            files,
            sequential_rename: rename,
        }
    }

    fn orchestrator(
        runner: Arc<StubRunner>,
        store: Arc<dyn ObjectStore>,
    ) -> BatchOrchestrator<StubRunner> {
        BatchOrchestrator::new(
            runner,
            store,
            Arc::new(EventBus::default()),
            OrchestratorConfig { concurrency: 3 },
        )
    }

    fn progress_channel() -> (watch::Sender<BatchProgress>, watch::Receiver<BatchProgress>) {
        watch::channel(BatchProgress::default())
    }

    // -- Scenarios ----------------------------------------------------------

    #[tokio::test]
    async fn batch_of_five_with_one_failure_still_finishes() {
        let runner = Arc::new(StubRunner::failing_on("img_2"));
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let orch = orchestrator(Arc::clone(&runner), store);

        let mut files = HashMap::new();
        files.insert("photos".to_string(), batch_files(5));

        let (tx, rx) = progress_channel();
        let outcome = orch.run_batch(request_with(files, false), &tx).await.unwrap();

        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.succeeded, 4);
        assert_eq!(outcome.failed, 1);
        assert!(!outcome.is_clean());

        // Every item was attempted and shares the batch id.
        let requests = runner.requests().await;
        assert_eq!(requests.len(), 5);
        for request in &requests {
            assert_eq!(request.batch_id, Some(outcome.batch_id));
        }

        let last = *rx.borrow();
        assert!(last.finished());
        assert_eq!(last.succeeded + last.failed, 5);
    }

    #[tokio::test]
    async fn worker_pool_never_exceeds_configured_concurrency() {
        let runner = Arc::new(StubRunner::new());
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let orch = orchestrator(Arc::clone(&runner), store);

        let mut files = HashMap::new();
        files.insert("photos".to_string(), batch_files(10));

        let (tx, _rx) = progress_channel();
        let outcome = orch.run_batch(request_with(files, false), &tx).await.unwrap();

        assert_eq!(outcome.succeeded, 10);
        assert!(runner.max_seen.load(Ordering::SeqCst) <= 3);
        // With 10 items the pool should actually overlap work.
        assert!(runner.max_seen.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn submission_without_batch_files_runs_one_job() {
        let runner = Arc::new(StubRunner::new());
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let orch = orchestrator(Arc::clone(&runner), store);

        let (tx, _rx) = progress_channel();
        let outcome = orch
            .run_batch(request_with(HashMap::new(), false), &tx)
            .await
            .unwrap();

        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(runner.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_required_field_aborts_before_any_work() {
        let runner = Arc::new(StubRunner::new());
        let memory = Arc::new(MemoryObjectStore::new());
        let store: Arc<dyn ObjectStore> = Arc::clone(&memory) as Arc<dyn ObjectStore>;
        let orch = orchestrator(Arc::clone(&runner), store);

        let mut request = request_with(HashMap::new(), false);
        request.form_values.remove("brand_name");

        let (tx, _rx) = progress_channel();
        let err = orch.run_batch(request, &tx).await.unwrap_err();

        assert!(matches!(err, OrchestratorError::Validation(_)));
        assert!(err.to_string().contains("Brand"));
        assert!(runner.requests().await.is_empty());
        assert_eq!(memory.len().await, 0);
    }

    #[tokio::test]
    async fn static_upload_failure_aborts_the_whole_submission() {
        let runner = Arc::new(StubRunner::new());
        let store: Arc<dyn ObjectStore> = Arc::new(FlakyStore {
            inner: MemoryObjectStore::new(),
            fail_on: "static_".to_string(),
        });
        let orch = orchestrator(Arc::clone(&runner), store);

        let mut files = HashMap::new();
        files.insert(
            "logo".to_string(),
            vec![FileInput {
                filename: "logo.png".to_string(),
                bytes: vec![1],
            }],
        );
        files.insert("photos".to_string(), batch_files(3));

        let (tx, _rx) = progress_channel();
        let err = orch.run_batch(request_with(files, false), &tx).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::StaticUploadFailed { ref label, .. } if label == "Logo"
        ));
        assert!(runner.requests().await.is_empty());
    }

    #[tokio::test]
    async fn batch_item_upload_failure_only_fails_that_item() {
        let runner = Arc::new(StubRunner::new());
        let store: Arc<dyn ObjectStore> = Arc::new(FlakyStore {
            inner: MemoryObjectStore::new(),
            fail_on: "img_3".to_string(),
        });
        let orch = orchestrator(Arc::clone(&runner), store);

        let mut files = HashMap::new();
        files.insert("photos".to_string(), batch_files(5));

        let (tx, _rx) = progress_channel();
        let outcome = orch.run_batch(request_with(files, false), &tx).await.unwrap();

        assert_eq!(outcome.succeeded, 4);
        assert_eq!(outcome.failed, 1);
        // The failed item never reached the runner.
        assert_eq!(runner.requests().await.len(), 4);
    }

    #[tokio::test]
    async fn sequential_rename_uses_brand_and_sequence() {
        let runner = Arc::new(StubRunner::new());
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let orch = orchestrator(Arc::clone(&runner), store);

        let mut files = HashMap::new();
        files.insert("photos".to_string(), batch_files(2));

        let (tx, _rx) = progress_channel();
        orch.run_batch(request_with(files, true), &tx).await.unwrap();

        let mut urls: Vec<String> = runner
            .requests()
            .await
            .iter()
            .map(|r| r.inputs["photos"].as_str().unwrap().to_string())
            .collect();
        urls.sort();

        assert!(urls[0].starts_with("memory://uploads/Acme_001_"), "{}", urls[0]);
        assert!(urls[1].starts_with("memory://uploads/Acme_002_"), "{}", urls[1]);
    }

    #[tokio::test]
    async fn static_urls_are_shared_across_all_items() {
        let runner = Arc::new(StubRunner::new());
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let orch = orchestrator(Arc::clone(&runner), store);

        let mut files = HashMap::new();
        files.insert(
            "logo".to_string(),
            vec![FileInput {
                filename: "logo.png".to_string(),
                bytes: vec![1],
            }],
        );
        files.insert("photos".to_string(), batch_files(3));

        let (tx, _rx) = progress_channel();
        orch.run_batch(request_with(files, false), &tx).await.unwrap();

        let requests = runner.requests().await;
        let logo_urls: std::collections::HashSet<&str> = requests
            .iter()
            .map(|r| r.inputs["logo"].as_str().unwrap())
            .collect();
        // One upload, one URL, reused by every item.
        assert_eq!(logo_urls.len(), 1);

        let photo_urls: std::collections::HashSet<&str> = requests
            .iter()
            .map(|r| r.inputs["photos"].as_str().unwrap())
            .collect();
        assert_eq!(photo_urls.len(), 3);
    }
}
