//! Inbound webhook handlers.
//!
//! Routes:
//! - `POST /webhooks/comfy`    — provider-pushed terminal run status
//! - `POST /webhooks/payments` — verified purchase confirmation
//!
//! Neither endpoint carries a user session. The provider callback matches
//! records by run id; the payment webhook authenticates via an HMAC
//! signature over the raw body.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use fotogen_comfy::api::{RUN_STATUS_FAILED, RUN_STATUS_SUCCESS};
use fotogen_comfy::outputs::{extract_result_urls, RunOutput};
use fotogen_core::error::CoreError;
use fotogen_core::result_encoding::encode_result_urls;
use fotogen_core::types::DbId;
use fotogen_core::webhook_signing::verify_webhook_hmac;
use fotogen_db::repositories::{GenerationRepo, PaymentEventRepo, ProfileRepo};
use fotogen_events::{PlatformEvent, EVENT_CREDITS_CHANGED, EVENT_GENERATION_COMPLETED};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Provider callback
// ---------------------------------------------------------------------------

/// Terminal-status notification pushed by the compute provider.
#[derive(Debug, Deserialize)]
pub struct ProviderCallback {
    pub run_id: String,
    pub status: String,
    #[serde(default)]
    pub outputs: Vec<RunOutput>,
}

/// POST /api/v1/webhooks/comfy
///
/// Applies the same result-extraction priority rule as the polling path
/// and completes the matching record through the same guarded transition,
/// so whichever path fires first wins and the other is a no-op. Payloads
/// that don't match the expected shape get a generic processing-failed
/// response.
pub async fn provider_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let callback: ProviderCallback = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Malformed provider callback");
        AppError::BadRequest("Webhook processing failed".to_string())
    })?;

    tracing::info!(
        run_id = %callback.run_id,
        status = %callback.status,
        "Provider callback received",
    );

    match callback.status.as_str() {
        RUN_STATUS_SUCCESS => {
            let urls = extract_result_urls(&callback.outputs);
            if urls.is_empty() {
                let updated =
                    GenerationRepo::fail_by_run_id(&state.pool, &callback.run_id).await?;
                if updated.is_none() {
                    tracing::debug!(
                        run_id = %callback.run_id,
                        "Callback had no effect (unknown run or already terminal)",
                    );
                }
            } else {
                let encoded = encode_result_urls(&urls);
                match GenerationRepo::complete_by_run_id(&state.pool, &callback.run_id, &encoded)
                    .await?
                {
                    Some(generation) => {
                        state.events.publish(
                            PlatformEvent::new(EVENT_GENERATION_COMPLETED)
                                .with_source("generation", generation.id)
                                .with_actor(generation.user_id)
                                .with_payload(json!({
                                    "run_id": callback.run_id,
                                    "batch_id": generation.batch_id,
                                })),
                        );
                    }
                    None => tracing::debug!(
                        run_id = %callback.run_id,
                        "Callback had no effect (unknown run or already terminal)",
                    ),
                }
            }
        }
        RUN_STATUS_FAILED => {
            let updated = GenerationRepo::fail_by_run_id(&state.pool, &callback.run_id).await?;
            if updated.is_none() {
                tracing::debug!(
                    run_id = %callback.run_id,
                    "Callback had no effect (unknown run or already terminal)",
                );
            }
        }
        other => {
            // Non-terminal notifications are acknowledged without action.
            tracing::debug!(run_id = %callback.run_id, status = %other, "Ignoring non-terminal callback");
        }
    }

    Ok(Json(json!({ "received": true })))
}

// ---------------------------------------------------------------------------
// Purchase confirmation
// ---------------------------------------------------------------------------

/// Header carrying the hex HMAC-SHA256 signature of the raw body.
const SIGNATURE_HEADER: &str = "x-signature";

/// Verified completed-payment event from the payment processor.
#[derive(Debug, Deserialize)]
pub struct PaymentEventPayload {
    /// Processor-side event id; crediting is exactly-once per id.
    pub event_id: String,
    /// The purchasing user.
    pub user_id: DbId,
    /// Credits encoded in the payment's metadata.
    pub credits: i64,
}

/// POST /api/v1/webhooks/payments
///
/// Credits the ledger for the metadata-encoded amount exactly once per
/// payment event. Replayed deliveries are acknowledged without effect.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Missing webhook signature".into()))
        })?;

    if !verify_webhook_hmac(&state.config.payment_webhook_secret, &body, signature) {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid webhook signature".into(),
        )));
    }

    let event: PaymentEventPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid payment event: {e}")))?;

    if event.credits <= 0 {
        return Err(AppError::BadRequest(
            "Payment event credits must be positive".to_string(),
        ));
    }

    let first_seen = PaymentEventRepo::record_once(
        &state.pool,
        &event.event_id,
        event.user_id,
        event.credits,
    )
    .await?;

    if first_seen {
        let remaining = ProfileRepo::credit(&state.pool, event.user_id, event.credits).await?;

        state.events.publish(
            PlatformEvent::new(EVENT_CREDITS_CHANGED)
                .with_actor(event.user_id)
                .with_payload(json!({ "remaining": remaining })),
        );

        tracing::info!(
            event_id = %event.event_id,
            user_id = event.user_id,
            credits = event.credits,
            "Purchase credited",
        );
    } else {
        tracing::info!(
            event_id = %event.event_id,
            "Duplicate payment event ignored",
        );
    }

    Ok(Json(json!({ "received": true })))
}
