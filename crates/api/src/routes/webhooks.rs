//! Route definitions for inbound webhooks.
//!
//! ```text
//! POST /comfy       provider_callback
//! POST /payments    payment_webhook
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes nested under `/webhooks`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comfy", post(webhooks::provider_callback))
        .route("/payments", post(webhooks::payment_webhook))
}
