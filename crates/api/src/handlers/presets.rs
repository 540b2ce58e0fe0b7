//! Handlers for saved brand presets.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use fotogen_core::types::DbId;
use fotogen_db::models::preset::CreateBrandPreset;
use fotogen_db::repositories::PresetRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/presets
///
/// The caller's saved presets, newest first.
pub async fn list_presets(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let presets = PresetRepo::list_by_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: presets }))
}

/// POST /api/v1/presets
///
/// Save the current form values under a name.
pub async fn create_preset(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateBrandPreset>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if !input.form_values.is_object() {
        return Err(AppError::BadRequest(
            "form_values must be a JSON object".to_string(),
        ));
    }

    let preset = PresetRepo::create(&state.pool, user.user_id, &input).await?;

    tracing::info!(
        preset_id = preset.id,
        user_id = user.user_id,
        "Brand preset saved",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: preset })))
}

/// DELETE /api/v1/presets/{id}
pub async fn delete_preset(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = PresetRepo::delete_for_user(&state.pool, user.user_id, id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Preset {id} not found")));
    }

    tracing::info!(preset_id = id, user_id = user.user_id, "Brand preset deleted");
    Ok(StatusCode::NO_CONTENT)
}
