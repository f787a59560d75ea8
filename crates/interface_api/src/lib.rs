//! HTTP API Layer
//!
//! REST surface of the claim sampling service using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: batch creation, review callbacks, extrapolation, reads
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: one error body shape for every failure
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(service, config).with_health_check(store);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_sampling::ClaimSamplingService;

use crate::config::ApiConfig;
use crate::handlers::{health, sampling, tasks};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ClaimSamplingService>,
    pub config: ApiConfig,
    /// Adapters asked by the readiness probe
    pub health_checks: Arc<Vec<Arc<dyn HealthCheckable>>>,
}

impl AppState {
    pub fn new(service: Arc<ClaimSamplingService>, config: ApiConfig) -> Self {
        Self {
            service,
            config,
            health_checks: Arc::new(Vec::new()),
        }
    }

    pub fn with_health_check(mut self, adapter: Arc<dyn HealthCheckable>) -> Self {
        Arc::make_mut(&mut self.health_checks).push(adapter);
        self
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let batch_routes = Router::new()
        .route("/", post(sampling::create_batch))
        .route("/:id", get(sampling::get_batch).put(sampling::update_batch))
        .route("/:id/claims", get(sampling::batch_claims))
        .route("/:id/summary", get(sampling::summary))
        .route("/:id/extrapolate", post(sampling::extrapolate));

    let task_routes = Router::new()
        .route("/resolved", post(tasks::task_resolved))
        .route("/completed", post(tasks::task_completed));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/sampling-batches", batch_routes)
        .nest("/tasks", task_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
