//! Fuelgate API Server
//!
//! Main entry point for the Fuelgate approval service.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fuelgate_api::{AppState, create_router};
use fuelgate_core::risk::{RiskAssessor, RiskConfig};
use fuelgate_engine::{
    EngineDependencies, InMemoryDefinitionRegistry, InMemoryInstanceStore,
    InMemoryTransactionGateway, SweeperTask, TracingEmitter, WorkflowEngine,
};
use fuelgate_shared::AppConfig;

mod catalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fuelgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // In-memory collaborators; durable stores plug in behind the same traits.
    let store = Arc::new(InMemoryInstanceStore::new());
    let registry = Arc::new(InMemoryDefinitionRegistry::new());
    let gateway = Arc::new(InMemoryTransactionGateway::new());

    let registered = catalog::register_standard_definitions(&registry)?;
    info!(count = registered, "standard workflow definitions registered");

    let risk = RiskAssessor::new(RiskConfig {
        high_score: config.risk.high_score,
        medium_score: config.risk.medium_score,
        high_value_threshold: config.risk.high_value_threshold,
        bulk_base_score: config.risk.bulk_base_score,
        fan_out_threshold: config.risk.fan_out_threshold,
        compliance_floor: config.risk.compliance_floor,
        ..RiskConfig::default()
    });

    let engine = Arc::new(WorkflowEngine::new(
        EngineDependencies {
            store,
            registry,
            gateway,
            emitter: Arc::new(TracingEmitter),
        },
        risk,
        config.engine.default_step_timeout_hours,
    ));

    // Escalation sweeper runs independently of request traffic.
    let sweeper = SweeperTask::new(
        engine.clone(),
        Duration::from_secs(config.engine.sweep_interval_secs),
    );
    tokio::spawn(sweeper.run());
    info!(
        interval_secs = config.engine.sweep_interval_secs,
        "escalation sweeper started"
    );

    // Create application state and router
    let state = AppState { engine };
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
