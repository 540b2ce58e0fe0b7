//! Route definitions for the workflow catalog.
//!
//! ```text
//! GET /         list_workflows
//! GET /{id}     get_workflow
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::workflows;
use crate::state::AppState;

/// Routes nested under `/workflows`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(workflows::list_workflows))
        .route("/{id}", get(workflows::get_workflow))
}
