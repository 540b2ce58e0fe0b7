//! Handlers for the workflow catalog (read-only).

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use fotogen_core::error::CoreError;
use fotogen_core::types::DbId;
use fotogen_db::repositories::WorkflowRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workflows
///
/// The full catalog, newest first.
pub async fn list_workflows(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let workflows = WorkflowRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: workflows }))
}

/// GET /api/v1/workflows/{id}
pub async fn get_workflow(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let workflow = WorkflowRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id,
        }))?;
    Ok(Json(DataResponse { data: workflow }))
}
