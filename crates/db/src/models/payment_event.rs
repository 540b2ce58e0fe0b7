//! Processed purchase event rows.

use fotogen_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `payment_events` table.
///
/// Each verified purchase webhook event is recorded here before its credits
/// apply; the unique `event_id` index makes crediting exactly-once.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentEvent {
    pub id: DbId,
    pub event_id: String,
    pub user_id: DbId,
    pub credits: i64,
    pub processed_at: Timestamp,
}
