//! HTTP API Layer
//!
//! REST API of the claims document assistant, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: claim pipeline endpoints, upload wizard sessions, health
//! - **Middleware**: request ids, tracing, request logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::with_store(Arc::new(InMemoryClaimStore::new()), config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod sessions;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    Router,
    routing::{get, post, put, delete},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::cors::{CorsLayer, Any};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_claims::{ClaimProcessor, ClaimStore};

use crate::config::ApiConfig;
use crate::handlers::{claims, health, wizard};
use crate::middleware::request_log_middleware;
use crate::sessions::SessionRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<ClaimProcessor>,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    /// Builds the state around a claim store, using the pipeline settings of `config`
    pub fn with_store(store: Arc<dyn ClaimStore>, config: ApiConfig) -> Self {
        let processor = ClaimProcessor::new(store, &config.pipeline);
        Self {
            processor: Arc::new(processor),
            sessions: Arc::new(SessionRegistry::new(config.wizard.session_ttl())),
            config: Arc::new(config),
        }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Uploads carry whole documents and get their own body limit
    let upload_routes = Router::new()
        .route("/upload", post(claims::upload_documents))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.upload.max_body_bytes));

    // Claim pipeline routes
    let claims_routes = Router::new()
        .route("/claims", get(claims::list_claims))
        .route("/claims/:id", get(claims::get_claim).delete(claims::delete_claim))
        .route("/classify/:id", post(claims::classify_claim))
        .route("/extract/:id", post(claims::extract_claim))
        .route("/evaluate/:id", post(claims::evaluate_claim))
        .route("/reports/:id", get(claims::get_report));

    // Upload wizard routes
    let wizard_routes = Router::new()
        .route("/wizard", post(wizard::create_session))
        .route("/wizard/:id", get(wizard::get_session).delete(wizard::delete_session))
        .route("/wizard/:id/files", put(wizard::select_files))
        .route("/wizard/:id/files/:name", delete(wizard::remove_file))
        .route("/wizard/:id/process", post(wizard::start_processing))
        .route("/wizard/:id/reset", post(wizard::reset_session));

    let api_routes = Router::new()
        .merge(upload_routes)
        .merge(claims_routes)
        .merge(wizard_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), request_log_middleware));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
