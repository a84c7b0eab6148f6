//! authgate - authentication boundary for web applications
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - {base_path}/*  GET|POST → authentication engine          │
//! │  - /              application shell                         │
//! │  - /health, /metrics                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Authentication engine                       │
//! │  - external service, reached through `AuthEngine`           │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       UI Layer                               │
//! │  - SessionContextProvider wraps the element tree            │
//! │  - components read session state from the context           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `auth`: auth route forwarding, engine seam, session records
//! - `ui`: element tree, session sources, session context provider
//! - `api`: application shell and metrics endpoints
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ui;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Delegates produced by the authentication engine
    pub auth: auth::AuthHandlers,
}

impl AppState {
    /// Initialize application state, building the engine from `config.auth`
    ///
    /// # Errors
    /// Returns error if the engine cannot be initialized
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let auth = auth::init(&config.auth)?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            auth,
        })
    }

    /// Application state around an already built engine
    pub fn with_engine(config: config::AppConfig, engine: Arc<dyn auth::AuthEngine>) -> Self {
        Self {
            config: Arc::new(config),
            auth: auth::AuthHandlers::from_engine(engine),
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, routing::get};
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    // Engine responses must reach the client byte for byte, so compression
    // only applies to the gateway's own pages.
    let pages = Router::new()
        .route("/", get(api::shell))
        .route("/health", get(health_check))
        .layer(CompressionLayer::new());

    let mut router = pages
        .merge(auth::auth_router::<AppState>(
            &state.config.auth.base_path,
            state.auth.clone(),
        ))
        .with_state(state.clone());

    if state.config.metrics.enabled {
        router = router.merge(api::metrics_router::<()>());
    }

    router.layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}
