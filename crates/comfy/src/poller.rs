//! Polling loop driving a run to a terminal state.
//!
//! After submission the provider is queried on a fixed interval until it
//! reports `success` or `failed`, or until the attempt budget runs out.
//! The budget exhaustion case is reported as its own outcome so timeouts
//! stay distinguishable from provider-reported failures.

use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ComfyDeployApi, ComfyDeployError, RunDetails, RUN_STATUS_SUCCESS};
use crate::outputs::extract_result_urls;

/// Default delay between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default attempt budget (~10 minutes at the default interval).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;

/// Source of run status snapshots.
///
/// [`ComfyDeployApi`] is the production implementation; tests substitute a
/// scripted stub.
#[async_trait]
pub trait RunStatusSource: Send + Sync {
    /// Fetch the current status of `run_id`.
    async fn run_status(&self, run_id: &str) -> Result<RunDetails, ComfyDeployError>;
}

#[async_trait]
impl RunStatusSource for ComfyDeployApi {
    async fn run_status(&self, run_id: &str) -> Result<RunDetails, ComfyDeployError> {
        self.get_run(run_id).await
    }
}

/// Terminal result of polling one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The run succeeded; `urls` are the extracted result images.
    Success { urls: Vec<String> },
    /// The provider reported the run failed.
    Failed,
    /// The attempt budget was exhausted without a terminal status.
    TimedOut { attempts: u32 },
}

/// Polls a run until it reaches a terminal state or the budget is spent.
pub struct RunPoller {
    interval: Duration,
    max_attempts: u32,
}

impl Default for RunPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RunPoller {
    /// Create a poller with an explicit interval and attempt budget.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Poll `run_id` until terminal or out of budget.
    ///
    /// Each attempt waits the configured interval, then queries the status
    /// source. A transient query error consumes an attempt and the loop
    /// continues; the budget bounds total wall-clock either way.
    pub async fn poll_until_terminal<S: RunStatusSource + ?Sized>(
        &self,
        source: &S,
        run_id: &str,
    ) -> PollOutcome {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;

            let details = match source.run_status(run_id).await {
                Ok(details) => details,
                Err(e) => {
                    tracing::warn!(run_id = %run_id, attempt, error = %e, "Run status query failed");
                    continue;
                }
            };

            if details.status == RUN_STATUS_SUCCESS {
                let urls = extract_result_urls(&details.outputs);
                tracing::debug!(run_id = %run_id, attempt, images = urls.len(), "Run succeeded");
                return PollOutcome::Success { urls };
            }
            if details.is_terminal() {
                tracing::debug!(run_id = %run_id, attempt, status = %details.status, "Run failed");
                return PollOutcome::Failed;
            }
        }

        tracing::warn!(
            run_id = %run_id,
            attempts = self.max_attempts,
            "Run did not reach a terminal state within the poll budget",
        );
        PollOutcome::TimedOut {
            attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Stub source that replays a fixed sequence of statuses, then repeats
    /// the last one forever.
    struct ScriptedSource {
        script: Vec<RunDetails>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(statuses: &[&str]) -> Self {
            let script = statuses
                .iter()
                .map(|s| RunDetails {
                    status: s.to_string(),
                    outputs: vec![],
                })
                .collect();
            Self {
                script,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RunStatusSource for ScriptedSource {
        async fn run_status(&self, _run_id: &str) -> Result<RunDetails, ComfyDeployError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let i = i.min(self.script.len() - 1);
            Ok(self.script[i].clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_success() {
        let source = ScriptedSource::new(&["queued", "running", "success"]);
        let poller = RunPoller::new(Duration::from_secs(2), 300);
        let outcome = poller.poll_until_terminal(&source, "run-1").await;
        assert_eq!(outcome, PollOutcome::Success { urls: vec![] });
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_provider_failure() {
        let source = ScriptedSource::new(&["running", "failed"]);
        let poller = RunPoller::new(Duration::from_secs(2), 300);
        let outcome = poller.poll_until_terminal(&source, "run-2").await;
        assert_eq!(outcome, PollOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_exactly_the_budget() {
        let source = ScriptedSource::new(&["running"]);
        let poller = RunPoller::new(Duration::from_secs(2), 300);
        let outcome = poller.poll_until_terminal(&source, "run-3").await;
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 300 });
        // Not one attempt more, not one fewer.
        assert_eq!(source.calls(), 300);
    }

    #[tokio::test(start_paused = true)]
    async fn success_carries_extracted_urls() {
        let mut details = RunDetails {
            status: "success".to_string(),
            outputs: vec![],
        };
        details.outputs = serde_json::from_value(serde_json::json!([
            { "data": { "images": [ { "url": "https://cdn/a.png" } ] } }
        ]))
        .unwrap();

        struct OneShot(RunDetails);

        #[async_trait]
        impl RunStatusSource for OneShot {
            async fn run_status(&self, _run_id: &str) -> Result<RunDetails, ComfyDeployError> {
                Ok(self.0.clone())
            }
        }

        let poller = RunPoller::new(Duration::from_millis(1), 5);
        let outcome = poller.poll_until_terminal(&OneShot(details), "run-4").await;
        assert_eq!(
            outcome,
            PollOutcome::Success {
                urls: vec!["https://cdn/a.png".to_string()]
            }
        );
    }
}
