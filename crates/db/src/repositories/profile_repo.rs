//! Repository for the `profiles` table — the credit ledger.
//!
//! The debit is one conditional UPDATE so two concurrent submissions can
//! never both pass a stale balance check. Ledger arithmetic always happens
//! in SQL; callers never push an absolute balance.

use sqlx::PgPool;

use fotogen_core::credits::NEW_USER_BALANCE;
use fotogen_core::types::DbId;

use crate::models::profile::{DebitOutcome, Profile};

/// Column list for `profiles` queries.
const COLUMNS: &str = "id, credits, created_at, updated_at";

/// Credit ledger operations.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Fetch a profile row by user id.
    pub async fn find_by_id(pool: &PgPool, user_id: DbId) -> Result<Option<Profile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM profiles WHERE id = $1");
        sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Current spendable balance. A missing profile reads as zero credits
    /// (a new user), not as an error.
    pub async fn get_credits(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let credits: Option<i64> =
            sqlx::query_scalar("SELECT credits FROM profiles WHERE id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(credits.unwrap_or(NEW_USER_BALANCE))
    }

    /// Atomically debit `amount` credits if the balance covers it.
    ///
    /// The guard and the decrement are one statement; if it matches no row
    /// the balance was insufficient (or the profile missing) and nothing
    /// was mutated.
    pub async fn try_debit(
        pool: &PgPool,
        user_id: DbId,
        amount: i64,
    ) -> Result<DebitOutcome, sqlx::Error> {
        let remaining: Option<i64> = sqlx::query_scalar(
            "UPDATE profiles \
             SET credits = credits - $2, updated_at = NOW() \
             WHERE id = $1 AND credits >= $2 \
             RETURNING credits",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(pool)
        .await?;

        match remaining {
            Some(remaining) => Ok(DebitOutcome::Debited { remaining }),
            None => {
                let available = Self::get_credits(pool, user_id).await?;
                Ok(DebitOutcome::InsufficientFunds { available })
            }
        }
    }

    /// Add credits to a balance, creating the profile row if needed.
    /// Returns the post-credit balance.
    pub async fn credit(pool: &PgPool, user_id: DbId, amount: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO profiles (id, credits) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE \
             SET credits = profiles.credits + EXCLUDED.credits, updated_at = NOW() \
             RETURNING credits",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(pool)
        .await
    }
}
