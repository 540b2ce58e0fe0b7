//! Batch progress and outcome snapshots.

use serde::Serialize;
use uuid::Uuid;

/// Point-in-time progress of a running batch.
///
/// Counters are monotonic; each item contributes to `succeeded` or `failed`
/// exactly once, so `succeeded + failed == total` marks completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// Items submitted in this batch.
    pub total: usize,
    /// Items that produced a result image.
    pub succeeded: usize,
    /// Items that ended without a result.
    pub failed: usize,
}

impl BatchProgress {
    /// Whether every item has reached a terminal state.
    pub fn finished(&self) -> bool {
        self.succeeded + self.failed >= self.total
    }
}

/// Final accounting of one batch submission.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// Batch identifier shared by every item.
    pub batch_id: Uuid,
    /// Items submitted.
    pub total: usize,
    /// Items that succeeded.
    pub succeeded: usize,
    /// Items that failed.
    pub failed: usize,
}

impl BatchOutcome {
    /// A batch is clean only when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Status of one generation job as it moves through the runner.
///
/// `Success`, `Failed`, and `TimedOut` are terminal. Timeout is kept
/// distinct from provider-reported failure for logging and diagnosis even
/// though both surface as an unsuccessful job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Polling,
    Success,
    Failed,
    TimedOut,
}

impl JobStatus {
    /// Whether this status ends the job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed | JobStatus::TimedOut)
    }
}
