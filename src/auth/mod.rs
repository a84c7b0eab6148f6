//! Authentication boundary
//!
//! Handles:
//! - Forwarding auth routes to the engine
//! - The engine seam and its upstream implementation
//! - Session records read from the engine

mod engine;
mod route;
pub mod session;
mod upstream;

pub use engine::{AuthEngine, AuthHandler, AuthHandlers, init};
pub use route::auth_router;
pub use session::{Session, SessionState, SessionUser};
pub use upstream::UpstreamAuthEngine;
