//! Authentication engine seam
//!
//! The engine is the external service that owns sign-in, callbacks, sign-out
//! and session state. The gateway talks to it through [`AuthEngine`] and never
//! interprets what it answers.

use std::sync::Arc;

use axum::{
    async_trait,
    body::Body,
    http::{HeaderMap, Request},
    response::Response,
};

use super::session::Session;
use super::upstream::UpstreamAuthEngine;
use crate::config::{AuthConfiguration, EngineKind};
use crate::error::AppError;

/// External authentication engine
#[async_trait]
pub trait AuthEngine: Send + Sync {
    /// Answer an authentication request
    ///
    /// Failures are the engine's to report: whatever it returns is what the
    /// client sees.
    async fn handle(&self, request: Request<Body>) -> Response;

    /// Resolve the session carried by a request's credentials
    async fn session(&self, headers: &HeaderMap) -> Result<Option<Session>, AppError>;
}

/// Delegate produced by initializing an engine
#[derive(Clone)]
pub struct AuthHandler {
    engine: Arc<dyn AuthEngine>,
}

impl AuthHandler {
    pub fn new(engine: Arc<dyn AuthEngine>) -> Self {
        Self { engine }
    }

    pub async fn handle(&self, request: Request<Body>) -> Response {
        self.engine.handle(request).await
    }

    pub async fn session(&self, headers: &HeaderMap) -> Result<Option<Session>, AppError> {
        self.engine.session(headers).await
    }
}

/// Method handlers registered on the auth routes
///
/// Both methods share one delegate.
#[derive(Clone)]
pub struct AuthHandlers {
    pub get: AuthHandler,
    pub post: AuthHandler,
}

impl AuthHandlers {
    pub fn from_engine(engine: Arc<dyn AuthEngine>) -> Self {
        let handler = AuthHandler::new(engine);
        Self {
            get: handler.clone(),
            post: handler,
        }
    }
}

/// Initialize the configured engine
///
/// # Errors
/// Returns a configuration error when the engine cannot be built from `config`
pub fn init(config: &AuthConfiguration) -> Result<AuthHandlers, AppError> {
    config.validate()?;

    let engine: Arc<dyn AuthEngine> = match config.engine {
        EngineKind::Upstream => Arc::new(UpstreamAuthEngine::new(config)?),
    };

    tracing::info!(
        base_path = %config.base_path,
        engine = ?config.engine,
        providers = config.providers.len(),
        "Authentication engine initialized"
    );

    Ok(AuthHandlers::from_engine(engine))
}
