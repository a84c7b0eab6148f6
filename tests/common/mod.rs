//! Common test utilities for E2E tests

use std::collections::HashMap;

use authgate::{AppState, config};
use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    /// Base URL of the stub authentication service
    pub upstream: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Gateway in front of a freshly spawned stub authentication service
    pub async fn new() -> Self {
        let upstream = spawn(stub_auth_service()).await;
        Self::with_upstream(&format!("{upstream}/auth")).await
    }

    /// Gateway in front of an arbitrary upstream URL
    pub async fn with_upstream(upstream: &str) -> Self {
        let config = test_config(upstream);
        let state = AppState::new(config).unwrap();

        let client = no_redirect_client();
        let addr = spawn(authgate::build_router(state.clone())).await;

        Self {
            addr,
            state,
            upstream: upstream.to_string(),
            client,
        }
    }

    /// Get base URL for gateway requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// URL of an auth action on the stub service, bypassing the gateway
    pub fn upstream_url(&self, action: &str) -> String {
        format!("{}{}", self.upstream, action)
    }
}

/// Client that hands 3xx responses back instead of following them
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

pub fn test_config(upstream: &str) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
        },
        auth: config::AuthConfiguration {
            base_path: "/api/auth".to_string(),
            url: Some("https://app.example.com".to_string()),
            engine: config::EngineKind::Upstream,
            upstream: config::UpstreamConfig {
                url: upstream.to_string(),
                timeout_seconds: 5,
                max_body_bytes: 4096,
            },
            providers: vec![config::ProviderConfig {
                id: "github".to_string(),
                name: "GitHub".to_string(),
                kind: "oauth".to_string(),
            }],
            callbacks: config::CallbackConfig::default(),
        },
        metrics: config::MetricsConfig { enabled: true },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Serve `app` on a random local port and return its base URL
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// A base URL nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/auth", addr)
}

// =============================================================================
// Stub authentication service
// =============================================================================

fn stub_auth_service() -> Router {
    Router::new()
        .route("/auth/session", get(stub_session))
        .route("/auth/signin/:provider", get(stub_signin))
        .route("/auth/signout", post(stub_signout))
        .route("/auth/error", get(stub_error))
        .fallback(stub_echo)
}

async fn stub_session(headers: HeaderMap) -> Json<serde_json::Value> {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if cookie.contains("session-token=valid") {
        Json(serde_json::json!({
            "user": {"name": "Ada Lovelace", "email": "ada@example.com", "image": null},
            "expires": "2099-01-01T00:00:00Z"
        }))
    } else if cookie.contains("session-token=expired") {
        Json(serde_json::json!({
            "user": {"name": "Old Session"},
            "expires": "2000-01-01T00:00:00Z"
        }))
    } else {
        Json(serde_json::json!({}))
    }
}

async fn stub_signin(
    Path(provider): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let callback = query.get("callbackUrl").cloned().unwrap_or_default();
    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&format!(
            "https://{provider}.example.com/authorize?state=stub&callback={callback}"
        ))
        .unwrap(),
    );
    headers.append(
        header::SET_COOKIE,
        HeaderValue::from_static("csrf-token=stub; Path=/; HttpOnly"),
    );
    headers.append(
        header::SET_COOKIE,
        HeaderValue::from_static("callback-url=%2F; Path=/"),
    );
    response
}

async fn stub_signout(body: String) -> Response {
    if !body.contains("csrfToken=") {
        return (StatusCode::FORBIDDEN, "MissingCSRF").into_response();
    }

    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    headers.insert(header::LOCATION, HeaderValue::from_static("/"));
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session-token=; Path=/; Max-Age=0"),
    );
    response
}

async fn stub_error(Query(query): Query<HashMap<String, String>>) -> Response {
    let error = query.get("error").cloned().unwrap_or_default();
    (StatusCode::FORBIDDEN, error).into_response()
}

async fn stub_echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    (
        [("x-upstream", "stub")],
        Json(serde_json::json!({
            "method": method.as_str(),
            "uri": uri.to_string(),
            "cookie": header("cookie"),
            "x_forwarded_host": header("x-forwarded-host"),
            "x_forwarded_proto": header("x-forwarded-proto"),
            "x_forwarded_prefix": header("x-forwarded-prefix"),
            "body": body,
        })),
    )
        .into_response()
}
