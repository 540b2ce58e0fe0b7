//! Route definitions for saved brand presets.
//!
//! ```text
//! GET    /         list_presets
//! POST   /         create_preset
//! DELETE /{id}     delete_preset
//! ```

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::presets;
use crate::state::AppState;

/// Routes nested under `/presets`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(presets::list_presets).post(presets::create_preset))
        .route("/{id}", delete(presets::delete_preset))
}
