//! Route definitions for the credit balance.
//!
//! ```text
//! GET /    get_credits
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::credits;
use crate::state::AppState;

/// Routes nested under `/credits`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(credits::get_credits))
}
