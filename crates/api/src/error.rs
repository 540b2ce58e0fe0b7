//! Application-level error type for HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use fotogen_core::error::CoreError;
use fotogen_pipeline::{OrchestratorError, RunnerError};

/// Wraps domain and infrastructure errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `fotogen_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A job-runner error from the pipeline.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// A batch-orchestrator error from the pipeline.
    #[error(transparent)]
    Batch(#[from] OrchestratorError),

    /// A missing resource addressed by something other than a row id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A fetch from an upstream service (provider CDN) failed.
    #[error("Upstream fetch failed: {0}")]
    Upstream(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Insufficient credits gets its own body shape so the caller can
        // render the required/available comparison and route to purchase.
        if let Some((required, available)) = self.insufficient_credits() {
            let body = json!({
                "error": format!(
                    "Insufficient credits: required {required}, available {available}"
                ),
                "code": "INSUFFICIENT_CREDITS",
                "required": required,
                "available": available,
            });
            return (StatusCode::PAYMENT_REQUIRED, axum::Json(body)).into_response();
        }

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => classify_core_error(core),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Pipeline errors ---
            AppError::Runner(err) => match err {
                RunnerError::Config(core) => classify_core_error(core),
                RunnerError::Ledger(db) => classify_sqlx_error(db),
                RunnerError::Submission(_)
                | RunnerError::ProviderFailed { .. }
                | RunnerError::TimedOut { .. }
                | RunnerError::NoResultImage { .. } => (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    err.to_string(),
                ),
                // Handled above.
                RunnerError::InsufficientCredits { .. } => unreachable!(),
            },
            AppError::Batch(err) => match err {
                OrchestratorError::Validation(core) => classify_core_error(core),
                OrchestratorError::StaticUploadFailed { .. } => {
                    (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED", err.to_string())
                }
            },

            // --- HTTP-specific errors ---
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Upstream(msg) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl AppError {
    /// The `(required, available)` pair when this error is an
    /// insufficient-credits condition, through any wrapping.
    fn insufficient_credits(&self) -> Option<(i64, i64)> {
        match self {
            AppError::Core(CoreError::InsufficientCredits { required, available })
            | AppError::Runner(RunnerError::InsufficientCredits { required, available }) => {
                Some((*required, *available))
            }
            _ => None,
        }
    }
}

/// Classify a core error into an HTTP status, error code, and message.
fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::InsufficientCredits { required, available } => (
            StatusCode::PAYMENT_REQUIRED,
            "INSUFFICIENT_CREDITS",
            format!("Insufficient credits: required {required}, available {available}"),
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        "A resource with these values already exists".to_string(),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            )
        }
    }
}
