//! Repository for the `generations` table.
//!
//! Completion is a guarded state transition: both the polling path and the
//! provider callback finish a row through the same compare-and-set UPDATE
//! keyed on `run_id` plus a non-terminal status, so whichever path fires
//! first wins and the other becomes a no-op.

use sqlx::PgPool;
use uuid::Uuid;

use fotogen_core::types::DbId;

use crate::models::generation::{
    CreateGeneration, Generation, STATUS_COMPLETED, STATUS_FAILED, STATUS_PROCESSING,
};

/// Column list for `generations` queries.
const COLUMNS: &str = "\
    id, user_id, workflow_id, run_id, input_image_url, result_image_url, \
    prompt_used, batch_id, status, created_at, completed_at";

/// Generation history operations.
pub struct GenerationRepo;

impl GenerationRepo {
    /// Insert a new row at submission time with status `processing`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGeneration,
    ) -> Result<Generation, sqlx::Error> {
        let query = format!(
            "INSERT INTO generations \
             (user_id, workflow_id, run_id, input_image_url, prompt_used, batch_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(input.user_id)
            .bind(input.workflow_id)
            .bind(&input.run_id)
            .bind(&input.input_image_url)
            .bind(&input.prompt_used)
            .bind(input.batch_id)
            .bind(STATUS_PROCESSING)
            .fetch_one(pool)
            .await
    }

    /// Transition the row for `run_id` to `completed` with its result,
    /// only if it has not already reached a terminal status.
    ///
    /// Returns the updated row, or `None` when no non-terminal row matched
    /// (unknown run id, or the other completion path won the race).
    pub async fn complete_by_run_id(
        pool: &PgPool,
        run_id: &str,
        result_image_url: &str,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET result_image_url = $2, status = $3, completed_at = NOW() \
             WHERE run_id = $1 AND status NOT IN ($4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(run_id)
            .bind(result_image_url)
            .bind(STATUS_COMPLETED)
            .bind(STATUS_COMPLETED)
            .bind(STATUS_FAILED)
            .fetch_optional(pool)
            .await
    }

    /// Transition the row for `run_id` to `failed`, guarded the same way as
    /// [`complete_by_run_id`](Self::complete_by_run_id).
    pub async fn fail_by_run_id(
        pool: &PgPool,
        run_id: &str,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET status = $2, completed_at = NOW() \
             WHERE run_id = $1 AND status NOT IN ($3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(run_id)
            .bind(STATUS_FAILED)
            .bind(STATUS_COMPLETED)
            .bind(STATUS_FAILED)
            .fetch_optional(pool)
            .await
    }

    /// Full history for a user, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generations \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Members of one batch, owned by `user_id`, oldest first.
    pub async fn list_batch_for_user(
        pool: &PgPool,
        user_id: DbId,
        batch_id: &Uuid,
    ) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generations \
             WHERE user_id = $1 AND batch_id = $2 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(user_id)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }

    /// Fetch one record, scoped to its owner.
    pub async fn find_for_user(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generations WHERE id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete one record, scoped to its owner. Returns whether a row went.
    pub async fn delete_for_user(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every member of a batch, scoped to the owner.
    /// Returns the number of rows deleted.
    pub async fn delete_batch_for_user(
        pool: &PgPool,
        user_id: DbId,
        batch_id: &Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM generations WHERE batch_id = $1 AND user_id = $2")
                .bind(batch_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
