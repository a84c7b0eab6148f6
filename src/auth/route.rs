//! Authentication routes
//!
//! Every request under the auth prefix goes to the engine untouched and the
//! engine's response comes back untouched.

use axum::{
    Router,
    extract::{Request, State},
    response::Response,
    routing::get,
};
use tracing::Instrument;

use super::engine::{AuthHandler, AuthHandlers};
use crate::metrics::{AUTH_REQUEST_DURATION_SECONDS, AUTH_REQUESTS_TOTAL};

/// Create authentication router
///
/// Routes:
/// - GET {base_path}/*action
/// - POST {base_path}/*action
///
/// HEAD is answered by the GET delegate with the body stripped. Any other
/// method gets 405 without reaching the engine.
pub fn auth_router<S>(base_path: &str, handlers: AuthHandlers) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(
            &format!("{base_path}/*action"),
            get(forward_get).post(forward_post),
        )
        .with_state(handlers)
}

async fn forward_get(State(handlers): State<AuthHandlers>, request: Request) -> Response {
    forward(&handlers.get, request).await
}

async fn forward_post(State(handlers): State<AuthHandlers>, request: Request) -> Response {
    forward(&handlers.post, request).await
}

async fn forward(handler: &AuthHandler, request: Request) -> Response {
    let method = request.method().clone();
    let span = tracing::debug_span!(
        "auth_request",
        method = %method,
        path = %request.uri().path(),
    );

    let timer = AUTH_REQUEST_DURATION_SECONDS
        .with_label_values(&[method.as_str()])
        .start_timer();
    let response = handler.handle(request).instrument(span.clone()).await;
    timer.observe_duration();

    AUTH_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();
    span.in_scope(|| tracing::debug!(status = %response.status(), "Authentication request handled"));

    response
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        async_trait,
        body::Body,
        http::{HeaderMap, HeaderValue, Method, StatusCode, header},
        response::IntoResponse,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::auth::engine::AuthEngine;
    use crate::auth::session::Session;
    use crate::error::AppError;

    /// Engine that answers with a deterministic response derived from the request
    #[derive(Default)]
    struct EchoEngine {
        seen: Mutex<Vec<(Method, String, Vec<u8>)>>,
    }

    #[async_trait]
    impl AuthEngine for EchoEngine {
        async fn handle(&self, request: axum::http::Request<Body>) -> Response {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX)
                .await
                .expect("test body");
            let uri = parts.uri.to_string();
            self.seen
                .lock()
                .expect("seen lock")
                .push((parts.method.clone(), uri.clone(), body.to_vec()));

            let status = if uri.contains("/signin") {
                StatusCode::FOUND
            } else if uri.contains("/error") {
                StatusCode::FORBIDDEN
            } else {
                StatusCode::OK
            };

            let mut response = (
                status,
                format!("{} {} {}", parts.method, uri, String::from_utf8_lossy(&body)),
            )
                .into_response();
            let headers = response.headers_mut();
            headers.insert(header::LOCATION, HeaderValue::from_static("/after"));
            headers.append(
                header::SET_COOKIE,
                HeaderValue::from_static("csrf=1; Path=/; HttpOnly"),
            );
            headers.append(
                header::SET_COOKIE,
                HeaderValue::from_static("callback=%2F; Path=/"),
            );
            response
        }

        async fn session(&self, _headers: &HeaderMap) -> Result<Option<Session>, AppError> {
            Ok(None)
        }
    }

    fn request(method: &Method, uri: &str, body: &'static str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(header::COOKIE, "session-token=abc")
            .body(Body::from(body))
            .expect("request")
    }

    async fn snapshot(response: Response) -> (StatusCode, HeaderMap, Vec<u8>) {
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.expect("body");
        (parts.status, parts.headers, body.to_vec())
    }

    #[tokio::test]
    async fn routed_response_matches_direct_engine_response() {
        let engine = Arc::new(EchoEngine::default());
        let router: Router = auth_router("/api/auth", AuthHandlers::from_engine(engine.clone()));

        let cases = [
            (Method::GET, "/api/auth/session", ""),
            (Method::GET, "/api/auth/signin/github?callbackUrl=%2Fdash", ""),
            (Method::POST, "/api/auth/signout", "csrfToken=t"),
            (Method::POST, "/api/auth/callback/credentials", "user=a&pass=b"),
            (Method::GET, "/api/auth/error?error=AccessDenied", ""),
        ];

        for (method, uri, body) in cases {
            let direct = snapshot(engine.handle(request(&method, uri, body)).await).await;
            let routed = snapshot(
                router
                    .clone()
                    .oneshot(request(&method, uri, body))
                    .await
                    .expect("infallible"),
            )
            .await;

            assert_eq!(direct, routed, "{method} {uri}");
        }

        let seen = engine.seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 10);
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[4].2, b"csrfToken=t");
    }

    #[tokio::test]
    async fn head_requests_reach_the_engine_through_get() {
        let engine = Arc::new(EchoEngine::default());
        let router: Router = auth_router("/api/auth", AuthHandlers::from_engine(engine.clone()));

        let (status, headers, body) = snapshot(
            router
                .oneshot(request(&Method::HEAD, "/api/auth/session", ""))
                .await
                .expect("infallible"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(body.is_empty());

        let seen = engine.seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, Method::HEAD);
        assert_eq!(seen[0].1, "/api/auth/session");
    }

    #[tokio::test]
    async fn other_methods_are_not_routed() {
        let engine = Arc::new(EchoEngine::default());
        let router: Router = auth_router("/api/auth", AuthHandlers::from_engine(engine.clone()));

        for method in [Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS] {
            let response = router
                .clone()
                .oneshot(request(&method, "/api/auth/session", ""))
                .await
                .expect("infallible");

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        }
        assert!(engine.seen.lock().expect("seen lock").is_empty());
    }

    #[tokio::test]
    async fn paths_outside_prefix_are_not_routed() {
        let engine = Arc::new(EchoEngine::default());
        let router: Router = auth_router("/api/auth", AuthHandlers::from_engine(engine.clone()));

        for uri in ["/api/auth", "/api/other/session", "/auth/session"] {
            let response = router
                .clone()
                .oneshot(request(&Method::GET, uri, ""))
                .await
                .expect("infallible");
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
        assert!(engine.seen.lock().expect("seen lock").is_empty());
    }
}
