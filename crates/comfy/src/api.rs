//! REST API client for the ComfyDeploy HTTP endpoints.
//!
//! Wraps run creation (`POST /api/run/deployment/queue`) and run status
//! (`GET /api/run/{run_id}`) using [`reqwest`], authenticated with a
//! bearer credential.

use serde::Deserialize;

use crate::outputs::RunOutput;

/// Provider statuses that end a run.
pub const RUN_STATUS_SUCCESS: &str = "success";
pub const RUN_STATUS_FAILED: &str = "failed";

/// Connection configuration for the ComfyDeploy API.
///
/// Injected explicitly — never read from the environment at module scope.
#[derive(Debug, Clone)]
pub struct ComfyDeployConfig {
    /// Base HTTP URL, e.g. `https://api.comfydeploy.com`.
    pub base_url: String,
    /// Bearer credential for every request.
    pub api_key: String,
}

/// HTTP client for the ComfyDeploy API.
pub struct ComfyDeployApi {
    client: reqwest::Client,
    config: ComfyDeployConfig,
}

/// Response returned after successfully queueing a deployment run.
#[derive(Debug, Deserialize)]
pub struct QueuedRun {
    /// Server-assigned identifier for the queued run.
    pub run_id: String,
}

/// Status payload for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunDetails {
    /// Current run status, e.g. `"queued"`, `"running"`, `"success"`,
    /// `"failed"`.
    pub status: String,
    /// Outputs present once the run succeeds.
    #[serde(default)]
    pub outputs: Vec<RunOutput>,
}

impl RunDetails {
    /// Whether the provider considers this run finished.
    pub fn is_terminal(&self) -> bool {
        self.status == RUN_STATUS_SUCCESS || self.status == RUN_STATUS_FAILED
    }
}

/// Errors from the ComfyDeploy REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyDeployError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyDeploy returned a non-2xx status code.
    #[error("ComfyDeploy API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The queue response carried no run identifier. The raw body is kept
    /// so the rejection reason can be diagnosed.
    #[error("ComfyDeploy returned no run id: {body}")]
    MissingRunId {
        /// Raw response body.
        body: String,
    },
}

impl ComfyDeployApi {
    /// Create a new API client.
    pub fn new(config: ComfyDeployConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: ComfyDeployConfig) -> Self {
        Self { client, config }
    }

    /// Queue a deployment run.
    ///
    /// Sends `POST /api/run/deployment/queue` with
    /// `{ deployment_id, inputs }`. A response without a `run_id` is a hard
    /// failure carrying the raw body.
    pub async fn queue_deployment(
        &self,
        deployment_id: &str,
        inputs: &serde_json::Value,
    ) -> Result<QueuedRun, ComfyDeployError> {
        let body = serde_json::json!({
            "deployment_id": deployment_id,
            "inputs": inputs,
        });

        let response = self
            .client
            .post(format!("{}/api/run/deployment/queue", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let raw = response.text().await?;

        match serde_json::from_str::<QueuedRun>(&raw) {
            Ok(queued) if !queued.run_id.is_empty() => Ok(queued),
            _ => Err(ComfyDeployError::MissingRunId { body: raw }),
        }
    }

    /// Fetch the current status of a run.
    ///
    /// Sends `GET /api/run/{run_id}`.
    pub async fn get_run(&self, run_id: &str) -> Result<RunDetails, ComfyDeployError> {
        let response = self
            .client
            .get(format!("{}/api/run/{}", self.config.base_url, run_id))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json::<RunDetails>().await?)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`ComfyDeployError::Api`] containing the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyDeployError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyDeployError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_run_deserializes() {
        let queued: QueuedRun =
            serde_json::from_str(r#"{"run_id":"run-abc","queue_position":3}"#).unwrap();
        assert_eq!(queued.run_id, "run-abc");
    }

    #[test]
    fn run_details_terminal_states() {
        let success: RunDetails =
            serde_json::from_str(r#"{"status":"success","outputs":[]}"#).unwrap();
        assert!(success.is_terminal());

        let failed: RunDetails = serde_json::from_str(r#"{"status":"failed"}"#).unwrap();
        assert!(failed.is_terminal());

        let queued: RunDetails = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert!(!queued.is_terminal());
    }
}
