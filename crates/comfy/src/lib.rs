//! ComfyDeploy REST client library.
//!
//! Wraps the hosted ComfyDeploy HTTP API: queueing a deployment run,
//! fetching run status, extracting result image URLs from terminal
//! payloads, and polling a run to a terminal state on a fixed budget.

pub mod api;
pub mod outputs;
pub mod poller;

pub use api::{ComfyDeployApi, ComfyDeployConfig, ComfyDeployError, QueuedRun, RunDetails};
pub use outputs::{extract_result_urls, RunOutput};
pub use poller::{PollOutcome, RunPoller, RunStatusSource};
