//! User profile rows: the credit ledger lives here.

use fotogen_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub id: DbId,
    pub credits: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of an atomic conditional debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The debit applied; `remaining` is the post-debit balance.
    Debited { remaining: i64 },
    /// The balance could not cover the amount; nothing was mutated.
    InsufficientFunds { available: i64 },
}
