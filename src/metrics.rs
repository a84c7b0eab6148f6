//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth forwarding metrics
    pub static ref AUTH_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_auth_requests_total", "Total number of forwarded authentication requests"),
        &["method", "status"]
    ).expect("metric can be created");
    pub static ref AUTH_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "authgate_auth_request_duration_seconds",
            "Time spent in the authentication engine per request"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method"]
    ).expect("metric can be created");

    // Session context metrics
    pub static ref SESSION_SUBSCRIPTIONS_ACTIVE: IntGauge = IntGauge::new(
        "authgate_session_subscriptions_active",
        "Current number of mounted session providers"
    ).expect("metric can be created");

    // Error metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_errors_total", "Total number of locally produced errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; registration happens on the first call only.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(AUTH_REQUESTS_TOTAL.clone()))
            .expect("AUTH_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(AUTH_REQUEST_DURATION_SECONDS.clone()))
            .expect("AUTH_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(SESSION_SUBSCRIPTIONS_ACTIVE.clone()))
            .expect("SESSION_SUBSCRIPTIONS_ACTIVE can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}
