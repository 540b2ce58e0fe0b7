//! Pipeline tunables.
//!
//! Everything here is injected into the runner/orchestrator constructors;
//! nothing is read from the environment at module scope. The API crate
//! builds these from env vars at startup.

use std::time::Duration;

/// Default delay between run-status polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Default poll attempt budget (~10 minutes at the default interval).
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;

/// Default number of concurrently in-flight jobs per batch.
const DEFAULT_CONCURRENCY: usize = 3;

/// Tunables for one [`GenerationRunner`](crate::GenerationRunner).
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Delay between run-status polls.
    pub poll_interval: Duration,
    /// Poll attempts before a run is declared timed out.
    pub max_poll_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Tunables for one [`BatchOrchestrator`](crate::BatchOrchestrator).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Worker pool size: how many jobs of one batch run at once.
    pub concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}
