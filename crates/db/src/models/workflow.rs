//! Workflow catalog rows.

use fotogen_core::error::CoreError;
use fotogen_core::types::{DbId, Timestamp};
use fotogen_core::workflow::InputsConfig;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `workflows` table.
///
/// Workflows are created and edited out of band (admin/seed data); this
/// service only reads them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Workflow {
    pub id: DbId,
    pub title: String,
    pub description: String,
    /// Credits debited per generation.
    pub cost: i64,
    /// Execution backend, e.g. `"comfy"`.
    pub execution_type: String,
    /// Provider-side deployment identifier.
    pub external_id: String,
    /// Raw JSONB input configuration; parse with
    /// [`Workflow::parsed_inputs_config`].
    pub inputs_config: serde_json::Value,
    pub created_at: Timestamp,
}

impl Workflow {
    /// Deserialize the stored `inputs_config` into its typed form.
    pub fn parsed_inputs_config(&self) -> Result<InputsConfig, CoreError> {
        serde_json::from_value(self.inputs_config.clone()).map_err(|e| {
            CoreError::Internal(format!(
                "Workflow {} has invalid inputs_config: {e}",
                self.id
            ))
        })
    }
}
