//! HTTP API layer with Axum routes.
//!
//! This crate provides the thin transport surface over the workflow
//! engine: REST routes, request/response DTOs, and error mapping.
//! Authentication is an external concern; approver identity arrives in
//! request payloads.

pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fuelgate_engine::WorkflowEngine;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The workflow engine.
    pub engine: Arc<WorkflowEngine>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .merge(routes::health::routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
