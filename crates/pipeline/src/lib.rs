//! Generation pipeline: the credit-gated job runner and the batch
//! orchestrator that fans one submission out into N concurrent jobs.

pub mod config;
pub mod orchestrator;
pub mod provider;
pub mod runner;
pub mod store;

pub use config::{OrchestratorConfig, RunnerConfig};
pub use orchestrator::{BatchOrchestrator, BatchRequest, FileInput, OrchestratorError};
pub use provider::ComputeProvider;
pub use runner::{CompletedJob, GenerationRunner, ItemRunner, JobRequest, RunnerError};
pub use store::{CreditLedger, GenerationStore, PgStore};
