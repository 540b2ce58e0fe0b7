//! Domain error type shared by every fotogen crate.

use crate::types::DbId;

/// Domain-level error for core logic and repositories.
///
/// HTTP mapping lives in the API crate; this enum stays transport-agnostic.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity lookup came back empty.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Entity kind, e.g. `"Workflow"`.
        entity: &'static str,
        /// The id that was looked up.
        id: DbId,
    },

    /// Input failed a validation rule.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The caller's balance cannot cover the requested debit.
    ///
    /// Carries both sides of the comparison so the caller can render
    /// "you need X, you have Y" and redirect to the purchase flow.
    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientCredits {
        /// Credits the operation costs.
        required: i64,
        /// Credits currently on the balance.
        available: i64,
    },

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
