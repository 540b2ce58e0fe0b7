//! Persistence seams for the runner.
//!
//! The runner talks to the ledger and the generation history through these
//! traits so its control flow is testable without a database. [`PgStore`]
//! is the production implementation, delegating to the sqlx repositories.

use async_trait::async_trait;
use sqlx::PgPool;

use fotogen_core::types::DbId;
use fotogen_db::models::generation::CreateGeneration;
use fotogen_db::models::profile::DebitOutcome;
use fotogen_db::repositories::{GenerationRepo, ProfileRepo};

/// The credit ledger, debited/credited around job execution.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Atomic conditional debit. Never mutates on insufficient funds.
    async fn try_debit(&self, user_id: DbId, amount: i64) -> Result<DebitOutcome, sqlx::Error>;

    /// Add credits back (purchase, or compensation for a failed job).
    /// Returns the post-credit balance.
    async fn credit(&self, user_id: DbId, amount: i64) -> Result<i64, sqlx::Error>;
}

/// The generation history, written around job execution.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Insert a `processing` row at submission time. Returns its id.
    async fn insert(&self, input: &CreateGeneration) -> Result<DbId, sqlx::Error>;

    /// Guarded completion by run id. Returns whether this call won the
    /// transition (false when the row is unknown or already terminal).
    async fn complete(&self, run_id: &str, result_image_url: &str) -> Result<bool, sqlx::Error>;

    /// Guarded failure by run id, same contract as `complete`.
    async fn fail(&self, run_id: &str) -> Result<bool, sqlx::Error>;
}

/// Production store over a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditLedger for PgStore {
    async fn try_debit(&self, user_id: DbId, amount: i64) -> Result<DebitOutcome, sqlx::Error> {
        ProfileRepo::try_debit(&self.pool, user_id, amount).await
    }

    async fn credit(&self, user_id: DbId, amount: i64) -> Result<i64, sqlx::Error> {
        ProfileRepo::credit(&self.pool, user_id, amount).await
    }
}

#[async_trait]
impl GenerationStore for PgStore {
    async fn insert(&self, input: &CreateGeneration) -> Result<DbId, sqlx::Error> {
        GenerationRepo::create(&self.pool, input).await.map(|g| g.id)
    }

    async fn complete(&self, run_id: &str, result_image_url: &str) -> Result<bool, sqlx::Error> {
        GenerationRepo::complete_by_run_id(&self.pool, run_id, result_image_url)
            .await
            .map(|row| row.is_some())
    }

    async fn fail(&self, run_id: &str) -> Result<bool, sqlx::Error> {
        GenerationRepo::fail_by_run_id(&self.pool, run_id)
            .await
            .map(|row| row.is_some())
    }
}
