//! Repository for the `brand_presets` table.

use sqlx::PgPool;

use fotogen_core::types::DbId;

use crate::models::preset::{BrandPreset, CreateBrandPreset};

/// Column list for `brand_presets` queries.
const COLUMNS: &str = "id, user_id, name, form_values, created_at";

/// Saved-preset operations, always scoped to the owning user.
pub struct PresetRepo;

impl PresetRepo {
    /// Save a new preset.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateBrandPreset,
    ) -> Result<BrandPreset, sqlx::Error> {
        let query = format!(
            "INSERT INTO brand_presets (user_id, name, form_values) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BrandPreset>(&query)
            .bind(user_id)
            .bind(&input.name)
            .bind(&input.form_values)
            .fetch_one(pool)
            .await
    }

    /// List a user's presets, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<BrandPreset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM brand_presets \
             WHERE user_id = $1 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, BrandPreset>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete one preset, scoped to its owner. Returns whether a row went.
    pub async fn delete_for_user(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM brand_presets WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
