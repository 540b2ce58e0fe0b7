//! Repository for the `payment_events` table.

use sqlx::PgPool;

use fotogen_core::types::DbId;

/// Processed purchase event bookkeeping.
pub struct PaymentEventRepo;

impl PaymentEventRepo {
    /// Record a payment event id if it has not been seen before.
    ///
    /// Returns `true` when this call recorded the event (the caller should
    /// apply its credits) and `false` when the event was already processed.
    pub async fn record_once(
        pool: &PgPool,
        event_id: &str,
        user_id: DbId,
        credits: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO payment_events (event_id, user_id, credits) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(credits)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
