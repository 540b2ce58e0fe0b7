//! Route definitions for generation history.
//!
//! ```text
//! GET    /                        list_generations
//! DELETE /{id}                    delete_generation
//! DELETE /groups/{key}            delete_group
//! GET    /groups/{key}/archive    export_group
//! ```

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::generations;
use crate::state::AppState;

/// Routes nested under `/generations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(generations::list_generations))
        .route("/{id}", delete(generations::delete_generation))
        .route("/groups/{key}", delete(generations::delete_group))
        .route("/groups/{key}/archive", get(generations::export_group))
}
