use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fotogen_api::config::ServerConfig;
use fotogen_api::router::build_app_router;
use fotogen_api::state::AppState;
use fotogen_cloud::{ObjectStore, S3ObjectStore};
use fotogen_comfy::ComfyDeployApi;
use fotogen_pipeline::{BatchOrchestrator, GenerationRunner, PgStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fotogen_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = fotogen_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    fotogen_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    fotogen_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let events = Arc::new(fotogen_events::EventBus::default());

    // --- Compute provider ---
    let provider = Arc::new(ComfyDeployApi::new(config.comfy.clone()));
    tracing::info!(base_url = %config.comfy.base_url, "ComfyDeploy client ready");

    // --- Object storage ---
    let store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::from_env(config.storage.clone()).await);
    tracing::info!(bucket = %config.storage.bucket, "Object store ready");

    // --- Pipeline ---
    let pg_store = Arc::new(PgStore::new(pool.clone()));
    let runner = Arc::new(GenerationRunner::new(
        provider,
        pg_store,
        Arc::clone(&events),
        config.runner.clone(),
    ));
    let orchestrator = Arc::new(BatchOrchestrator::new(
        Arc::clone(&runner),
        store,
        Arc::clone(&events),
        config.orchestrator.clone(),
    ));
    tracing::info!(
        concurrency = config.orchestrator.concurrency,
        poll_attempts = config.runner.max_poll_attempts,
        "Generation pipeline ready",
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        events,
        runner,
        orchestrator,
        batches: Arc::new(RwLock::new(HashMap::new())),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Serve ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT combination");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
