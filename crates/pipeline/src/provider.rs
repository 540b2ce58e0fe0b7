//! The compute-provider seam.

use async_trait::async_trait;

use fotogen_comfy::api::{ComfyDeployApi, ComfyDeployError};
use fotogen_comfy::poller::RunStatusSource;

/// An external compute backend that queues deployment runs.
///
/// [`ComfyDeployApi`] is the production implementation; tests use scripted
/// stubs. The [`RunStatusSource`] supertrait supplies the polling half.
#[async_trait]
pub trait ComputeProvider: RunStatusSource {
    /// Queue a run of `deployment_id` with the given inputs.
    /// Returns the provider-assigned run identifier.
    async fn queue_run(
        &self,
        deployment_id: &str,
        inputs: &serde_json::Value,
    ) -> Result<String, ComfyDeployError>;
}

#[async_trait]
impl ComputeProvider for ComfyDeployApi {
    async fn queue_run(
        &self,
        deployment_id: &str,
        inputs: &serde_json::Value,
    ) -> Result<String, ComfyDeployError> {
        Ok(self.queue_deployment(deployment_id, inputs).await?.run_id)
    }
}
