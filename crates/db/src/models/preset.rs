//! Saved brand preset rows.

use fotogen_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `brand_presets` table: a named snapshot of form values
/// (text/select values and previously uploaded image URLs) a user can
/// reload into a workflow dialog.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BrandPreset {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub form_values: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for `POST /presets`.
#[derive(Debug, Deserialize)]
pub struct CreateBrandPreset {
    pub name: String,
    pub form_values: serde_json::Value,
}
