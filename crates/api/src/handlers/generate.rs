//! Handlers for generation submission.
//!
//! `POST /generate` is the credit-ledger boundary for a single job: it
//! loads the workflow, runs the job to completion (atomic debit, provider
//! submission, polling, history write) and returns the result image
//! reference. `POST /generate/batch` accepts a multipart submission with
//! N batch files, spawns the orchestrator, and returns the batch id for
//! live progress polling.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use fotogen_core::error::CoreError;
use fotogen_core::progress::BatchProgress;
use fotogen_core::types::DbId;
use fotogen_core::validation::validate_required_inputs;
use fotogen_core::workflow::EXECUTION_TYPE_COMFY;
use fotogen_db::models::workflow::Workflow;
use fotogen_db::repositories::WorkflowRepo;
use fotogen_pipeline::{BatchRequest, FileInput, JobRequest};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request/response DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub workflow_id: DbId,
    /// Field name → resolved value; image fields hold public URLs.
    pub inputs: serde_json::Map<String, serde_json::Value>,
}

/// Response of `POST /generate`.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub image_url: String,
    pub generation_id: Option<DbId>,
    pub remaining_credits: i64,
}

/// Response of `POST /generate/batch`.
#[derive(Debug, Serialize)]
pub struct BatchAccepted {
    pub batch_id: Uuid,
    pub total: usize,
}

/// Response of `GET /generate/batch/{id}/progress`.
#[derive(Debug, Serialize)]
pub struct BatchProgressView {
    pub batch_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load a workflow and check it runs on the compute provider.
async fn load_executable_workflow(state: &AppState, id: DbId) -> AppResult<Workflow> {
    let workflow = WorkflowRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id,
        }))?;

    if workflow.execution_type != EXECUTION_TYPE_COMFY {
        return Err(AppError::BadRequest(format!(
            "Workflow '{}' has unsupported execution type '{}'",
            workflow.title, workflow.execution_type
        )));
    }
    Ok(workflow)
}

// ---------------------------------------------------------------------------
// POST /generate
// ---------------------------------------------------------------------------

/// Run one generation job to completion and return the result reference.
///
/// Insufficient credits surfaces as a distinct 402 carrying the required
/// and current balance; generation failures surface as 502.
pub async fn generate(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<GenerateRequest>,
) -> AppResult<impl IntoResponse> {
    let workflow = load_executable_workflow(&state, input.workflow_id).await?;

    let job = state
        .runner
        .execute(&JobRequest {
            user_id: user.user_id,
            workflow,
            inputs: input.inputs,
            batch_id: None,
        })
        .await?;

    Ok(Json(DataResponse {
        data: GenerateResponse {
            image_url: job.result_image_url,
            generation_id: job.generation_id,
            remaining_credits: job.remaining_credits,
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /generate/batch
// ---------------------------------------------------------------------------

/// Accept a multipart batch submission and start the orchestrator.
///
/// Expected parts:
/// - `workflow_id`        — integer
/// - `form_values`        — JSON object of field values
/// - `sequential_rename`  — optional, `"true"` to enable
/// - any other part name  — file(s) for the image field of that name
///
/// Validation runs synchronously so a missing required field is a 400
/// here, before any upload or job. The batch itself runs in the
/// background; poll progress via the returned batch id.
pub async fn generate_batch(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut workflow_id: Option<DbId> = None;
    let mut sequential_rename = false;
    let mut form_values = serde_json::Map::new();
    let mut files: HashMap<String, Vec<FileInput>> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "workflow_id" => {
                let text = read_text(field).await?;
                workflow_id = Some(text.trim().parse().map_err(|_| {
                    AppError::BadRequest("workflow_id must be an integer".to_string())
                })?);
            }
            "sequential_rename" => {
                sequential_rename = read_text(field).await?.trim() == "true";
            }
            "form_values" => {
                let text = read_text(field).await?;
                form_values = serde_json::from_str(&text).map_err(|e| {
                    AppError::BadRequest(format!("form_values must be a JSON object: {e}"))
                })?;
            }
            _ => {
                let filename = field.file_name().unwrap_or("upload.png").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read '{name}': {e}")))?
                    .to_vec();
                files.entry(name).or_default().push(FileInput { filename, bytes });
            }
        }
    }

    let workflow_id = workflow_id
        .ok_or_else(|| AppError::BadRequest("workflow_id is required".to_string()))?;
    let workflow = load_executable_workflow(&state, workflow_id).await?;

    // Fail the submission now, not in a background log line. The
    // orchestrator re-checks, which is harmless.
    let inputs_config = workflow.parsed_inputs_config().map_err(AppError::Core)?;
    inputs_config.validate().map_err(AppError::Core)?;
    validate_required_inputs(&inputs_config, &form_values, |name| {
        files.get(name).is_some_and(|list| !list.is_empty())
    })
    .map_err(AppError::Core)?;

    let total = inputs_config
        .batch_field()
        .and_then(|f| files.get(&f.name))
        .map(|list| list.len())
        .unwrap_or(0)
        .max(1);

    let batch_id = Uuid::new_v4();
    let (tx, rx) = watch::channel(BatchProgress {
        total,
        succeeded: 0,
        failed: 0,
    });
    state.batches.write().await.insert(batch_id, rx);

    let request = BatchRequest {
        batch_id,
        user_id: user.user_id,
        workflow,
        form_values,
        files,
        sequential_rename,
    };

    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run_batch(request, &tx).await {
            tracing::error!(batch_id = %batch_id, error = %e, "Batch submission aborted");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: BatchAccepted { batch_id, total },
        }),
    ))
}

/// Read a text part, mapping failures to a 400.
async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart field: {e}")))
}

// ---------------------------------------------------------------------------
// GET /generate/batch/{id}/progress
// ---------------------------------------------------------------------------

/// Snapshot of a running (or finished) batch's progress counters.
pub async fn batch_progress(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let registry = state.batches.read().await;
    let receiver = registry
        .get(&batch_id)
        .ok_or_else(|| AppError::NotFound(format!("Batch {batch_id} not found")))?;

    let snapshot = *receiver.borrow();
    Ok(Json(DataResponse {
        data: BatchProgressView {
            batch_id,
            total: snapshot.total,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            finished: snapshot.finished(),
        },
    }))
}
