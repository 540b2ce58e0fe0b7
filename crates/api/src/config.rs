//! Server configuration, loaded once at startup.
//!
//! Everything downstream (provider client, pipeline, storage) receives its
//! configuration as an explicit struct built here — nothing reads the
//! environment at module scope.

use std::time::Duration;

use fotogen_cloud::S3Config;
use fotogen_comfy::ComfyDeployConfig;
use fotogen_pipeline::{OrchestratorConfig, RunnerConfig};

use crate::auth::jwt::JwtConfig;

/// Default ComfyDeploy API base URL.
const DEFAULT_COMFY_BASE_URL: &str = "https://api.comfydeploy.com";

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry duration).
    pub jwt: JwtConfig,
    /// ComfyDeploy connection (base URL, bearer credential).
    pub comfy: ComfyDeployConfig,
    /// Job runner tunables (poll interval, poll budget).
    pub runner: RunnerConfig,
    /// Batch orchestrator tunables (worker pool size).
    pub orchestrator: OrchestratorConfig,
    /// Object storage (bucket, public base URL).
    pub storage: S3Config,
    /// Shared secret verifying purchase webhook signatures.
    pub payment_webhook_secret: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Required | Default                       |
    /// |--------------------------|----------|-------------------------------|
    /// | `HOST`                   | no       | `0.0.0.0`                     |
    /// | `PORT`                   | no       | `3000`                        |
    /// | `CORS_ORIGINS`           | no       | `http://localhost:5173`       |
    /// | `REQUEST_TIMEOUT_SECS`   | no       | `30`                          |
    /// | `JWT_SECRET`             | **yes**  | --                            |
    /// | `COMFY_DEPLOY_API_KEY`   | **yes**  | --                            |
    /// | `COMFY_DEPLOY_BASE_URL`  | no       | `https://api.comfydeploy.com` |
    /// | `POLL_INTERVAL_SECS`     | no       | `2`                           |
    /// | `POLL_MAX_ATTEMPTS`      | no       | `300`                         |
    /// | `BATCH_CONCURRENCY`      | no       | `3`                           |
    /// | `S3_BUCKET`              | **yes**  | --                            |
    /// | `S3_PUBLIC_BASE_URL`     | **yes**  | --                            |
    /// | `PAYMENT_WEBHOOK_SECRET` | **yes**  | --                            |
    ///
    /// # Panics
    ///
    /// Panics on a missing required variable or an unparsable value; we
    /// want misconfiguration to fail fast at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        let comfy = ComfyDeployConfig {
            base_url: std::env::var("COMFY_DEPLOY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_COMFY_BASE_URL.into()),
            api_key: std::env::var("COMFY_DEPLOY_API_KEY")
                .expect("COMFY_DEPLOY_API_KEY must be set"),
        };

        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        let max_poll_attempts: u32 = std::env::var("POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("POLL_MAX_ATTEMPTS must be a valid u32");

        let runner = RunnerConfig {
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_poll_attempts,
        };

        let concurrency: usize = std::env::var("BATCH_CONCURRENCY")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("BATCH_CONCURRENCY must be a valid usize");

        let orchestrator = OrchestratorConfig { concurrency };

        let storage = S3Config {
            bucket: std::env::var("S3_BUCKET").expect("S3_BUCKET must be set"),
            public_base_url: std::env::var("S3_PUBLIC_BASE_URL")
                .expect("S3_PUBLIC_BASE_URL must be set"),
        };

        let payment_webhook_secret = std::env::var("PAYMENT_WEBHOOK_SECRET")
            .expect("PAYMENT_WEBHOOK_SECRET must be set");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            comfy,
            runner,
            orchestrator,
            storage,
            payment_webhook_secret,
        }
    }
}
