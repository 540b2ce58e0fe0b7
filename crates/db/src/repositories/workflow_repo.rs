//! Repository for the `workflows` table (read-only to this service).

use sqlx::PgPool;

use fotogen_core::types::DbId;

use crate::models::workflow::Workflow;

/// Column list for `workflows` queries.
const COLUMNS: &str =
    "id, title, description, cost, execution_type, external_id, inputs_config, created_at";

/// Workflow catalog lookups.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// Fetch one workflow by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflows WHERE id = $1");
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the full catalog, newest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Workflow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflows ORDER BY created_at DESC");
        sqlx::query_as::<_, Workflow>(&query).fetch_all(pool).await
    }
}
