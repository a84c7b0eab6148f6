//! Engine backed by an external authentication service
//!
//! Requests are relayed over HTTP. Redirects are not followed so the browser
//! receives the service's own 3xx responses and cookies.

use std::time::Duration;

use axum::{
    async_trait,
    body::Body,
    http::{
        HeaderMap, HeaderName, HeaderValue, Request, Uri,
        header::{COOKIE, HOST},
    },
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use url::Url;

use super::engine::AuthEngine;
use super::session::Session;
use crate::config::AuthConfiguration;
use crate::error::AppError;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Relays auth requests to `auth.upstream.url`
pub struct UpstreamAuthEngine {
    client: reqwest::Client,
    upstream: Url,
    base_path: String,
    public_url: Option<Url>,
    max_body_bytes: usize,
}

impl UpstreamAuthEngine {
    pub fn new(config: &AuthConfiguration) -> Result<Self, AppError> {
        let upstream = Url::parse(&config.upstream.url)
            .map_err(|e| AppError::Config(format!("auth.upstream.url: {e}")))?;
        let public_url = config
            .url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| AppError::Config(format!("auth.url: {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("authgate/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.upstream.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            client,
            upstream,
            base_path: config.base_path.clone(),
            public_url,
            max_body_bytes: config.upstream.max_body_bytes,
        })
    }

    /// Map a gateway URI onto the upstream service
    ///
    /// `/api/auth/signin/github?x=1` → `{upstream}/signin/github?x=1`
    fn target_url(&self, uri: &Uri) -> Url {
        let path = uri.path();
        let action = path.strip_prefix(self.base_path.as_str()).unwrap_or(path);
        self.join(action, uri.query())
    }

    fn join(&self, action: &str, query: Option<&str>) -> Url {
        let mut url = self.upstream.clone();
        let path = format!("{}{}", self.upstream.path().trim_end_matches('/'), action);
        url.set_path(&path);
        url.set_query(query);
        url
    }

    fn forwarded_headers(&self, incoming: &HeaderMap) -> HeaderMap {
        let mut headers = strip_hop_by_hop(incoming);
        headers.remove(HOST);

        let (host, proto) = match &self.public_url {
            Some(url) => (
                url.host_str().map(|host| match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                }),
                url.scheme().to_string(),
            ),
            None => (
                incoming
                    .get(HOST)
                    .and_then(|value| value.to_str().ok())
                    .map(ToOwned::to_owned),
                "http".to_string(),
            ),
        };

        if let Some(value) = host.and_then(|host| HeaderValue::from_str(&host).ok()) {
            headers.insert(HeaderName::from_static("x-forwarded-host"), value);
        }
        if let Ok(value) = HeaderValue::from_str(&proto) {
            headers.insert(HeaderName::from_static("x-forwarded-proto"), value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.base_path) {
            headers.insert(HeaderName::from_static("x-forwarded-prefix"), value);
        }

        headers
    }

    async fn relay(&self, request: Request<Body>) -> Result<Response, AppError> {
        let (parts, body) = request.into_parts();

        let body = read_body(body, self.max_body_bytes).await?;

        let url = self.target_url(&parts.uri);
        tracing::debug!(method = %parts.method, %url, "Relaying to upstream authentication service");

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(self.forwarded_headers(&parts.headers))
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let headers = strip_hop_by_hop(upstream.headers());
        let body = upstream.bytes().await?;

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[async_trait]
impl AuthEngine for UpstreamAuthEngine {
    async fn handle(&self, request: Request<Body>) -> Response {
        match self.relay(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "Upstream authentication request failed");
                error.into_response()
            }
        }
    }

    async fn session(&self, headers: &HeaderMap) -> Result<Option<Session>, AppError> {
        let mut request = self.client.get(self.join("/session", None));
        if let Some(cookie) = headers.get(COOKIE) {
            request = request.header(COOKIE, cookie.clone());
        }

        let response = request.send().await?.error_for_status()?;
        let body = response.bytes().await?;
        Session::from_document(&body)
    }
}

/// Buffer the client body, up to `limit` bytes
async fn read_body(body: Body, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::BodyRead(e.to_string()))?;
        if buffer.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge(limit));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers
}
