//! Route definitions for generation submission.
//!
//! ```text
//! POST /generate                          generate
//! POST /generate/batch                    generate_batch
//! GET  /generate/batch/{id}/progress      batch_progress
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generate;
use crate::state::AppState;

/// Routes merged at the `/api/v1` level.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate::generate))
        .route("/generate/batch", post(generate::generate_batch))
        .route(
            "/generate/batch/{id}/progress",
            get(generate::batch_progress),
        )
}
