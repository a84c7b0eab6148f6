//! API layer
//!
//! HTTP handlers for:
//! - Application shell (session-aware page)
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;

pub use metrics::metrics_router;
pub use pages::shell;
