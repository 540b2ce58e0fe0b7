//! Generation history rows and DTOs.

use fotogen_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Status vocabulary
// ---------------------------------------------------------------------------

/// Job submitted, no terminal result yet.
pub const STATUS_PROCESSING: &str = "processing";
/// Result image(s) obtained.
pub const STATUS_COMPLETED: &str = "completed";
/// Provider failure or poll-budget exhaustion.
pub const STATUS_FAILED: &str = "failed";

/// Statuses a row can never leave.
pub const TERMINAL_STATUSES: [&str; 2] = [STATUS_COMPLETED, STATUS_FAILED];

// ---------------------------------------------------------------------------
// Rows and DTOs
// ---------------------------------------------------------------------------

/// A row from the `generations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Generation {
    pub id: DbId,
    pub user_id: DbId,
    pub workflow_id: DbId,
    /// Provider-assigned run identifier; the callback path matches on this.
    pub run_id: Option<String>,
    /// Primary input image, for before/after display.
    pub input_image_url: Option<String>,
    /// Bare URL for a single image, JSON-array string for several.
    pub result_image_url: Option<String>,
    /// The full input mapping, minus internal bookkeeping fields.
    pub prompt_used: serde_json::Value,
    /// Shared id for batch submissions; `None` for standalone runs.
    pub batch_id: Option<Uuid>,
    pub status: String,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Fields for inserting a new generation row at submission time.
#[derive(Debug, Clone)]
pub struct CreateGeneration {
    pub user_id: DbId,
    pub workflow_id: DbId,
    pub run_id: Option<String>,
    pub input_image_url: Option<String>,
    pub prompt_used: serde_json::Value,
    pub batch_id: Option<Uuid>,
}
