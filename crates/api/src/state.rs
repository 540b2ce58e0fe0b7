//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use fotogen_comfy::ComfyDeployApi;
use fotogen_core::progress::BatchProgress;
use fotogen_events::EventBus;
use fotogen_pipeline::{BatchOrchestrator, GenerationRunner, PgStore};

use crate::config::ServerConfig;

/// The production job runner: ComfyDeploy provider over the Postgres store.
pub type AppRunner = GenerationRunner<ComfyDeployApi, PgStore>;

/// The production batch orchestrator.
pub type AppOrchestrator = BatchOrchestrator<AppRunner>;

/// Live progress receivers for running (and recently finished) batches,
/// keyed by batch id. A receiver always holds the latest snapshot.
pub type BatchRegistry = Arc<RwLock<HashMap<Uuid, watch::Receiver<BatchProgress>>>>;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: fotogen_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing platform events.
    pub events: Arc<EventBus>,
    /// Single-job runner (also the batch orchestrator's item runner).
    pub runner: Arc<AppRunner>,
    /// Batch orchestrator.
    pub orchestrator: Arc<AppOrchestrator>,
    /// Progress feeds of in-flight batches.
    pub batches: BatchRegistry,
}
