//! Route tables, one module per surface.

pub mod credits;
pub mod generation;
pub mod generations;
pub mod health;
pub mod presets;
pub mod webhooks;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// Assemble every `/api/v1` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/credits", credits::router())
        .nest("/workflows", workflows::router())
        .merge(generation::router())
        .nest("/generations", generations::router())
        .nest("/presets", presets::router())
        .nest("/webhooks", webhooks::router())
}
