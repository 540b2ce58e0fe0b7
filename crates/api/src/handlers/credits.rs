//! Handler for the credit balance read path.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use fotogen_db::repositories::ProfileRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Balance payload for `GET /credits`.
#[derive(Debug, Serialize)]
pub struct CreditsView {
    pub credits: i64,
}

/// GET /api/v1/credits
///
/// Current spendable balance. A user without a profile row reads as zero
/// credits, not as an error.
pub async fn get_credits(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let credits = ProfileRepo::get_credits(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse {
        data: CreditsView { credits },
    }))
}
