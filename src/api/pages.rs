//! Application shell
//!
//! - GET /

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Html,
};
use serde::Deserialize;

use crate::AppState;
use crate::auth::SessionState;
use crate::config::AuthConfiguration;
use crate::error::AppError;
use crate::ui::{Component, Element, SessionContext, SessionContextProvider, SessionHub};

/// Query parameters accepted by the shell
#[derive(Debug, Default, Deserialize)]
pub struct ShellQuery {
    /// Where to land after signing in
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// Header showing who is signed in
struct AccountHeader {
    base_path: String,
    /// (id, display name) per configured provider
    providers: Vec<(String, String)>,
    /// Already percent-encoded
    callback_url: String,
}

impl AccountHeader {
    fn new(auth: &AuthConfiguration, callback_url: &str) -> Self {
        Self {
            base_path: auth.base_path.clone(),
            providers: auth
                .providers
                .iter()
                .map(|provider| (provider.id.clone(), provider.name.clone()))
                .collect(),
            callback_url: url::form_urlencoded::byte_serialize(callback_url.as_bytes()).collect(),
        }
    }

    fn sign_in_links(&self) -> Vec<Element> {
        if self.providers.is_empty() {
            return vec![
                Element::node("a")
                    .attr(
                        "href",
                        format!("{}/signin?callbackUrl={}", self.base_path, self.callback_url),
                    )
                    .child(Element::text("Sign in")),
            ];
        }

        self.providers
            .iter()
            .map(|(id, name)| {
                Element::node("a")
                    .attr(
                        "href",
                        format!(
                            "{}/signin/{id}?callbackUrl={}",
                            self.base_path, self.callback_url
                        ),
                    )
                    .child(Element::text(format!("Sign in with {name}")))
            })
            .collect()
    }
}

impl Component for AccountHeader {
    fn render(&self, session: &SessionContext) -> Element {
        let header = Element::node("header").attr("data-session-status", session.state().status());

        match session.state() {
            SessionState::Authenticated(current) => {
                let name = current.display_name().unwrap_or("signed-in user").to_string();
                header
                    .child(
                        Element::node("span")
                            .attr("class", "account")
                            .child(Element::text(format!("Signed in as {name}"))),
                    )
                    .child(
                        Element::node("a")
                            .attr("href", format!("{}/signout", self.base_path))
                            .child(Element::text("Sign out")),
                    )
            }
            SessionState::Unauthenticated => self
                .sign_in_links()
                .into_iter()
                .fold(header, |header, link| header.child(link)),
            SessionState::Loading => header.child(Element::text("Loading…")),
        }
    }
}

/// Page body rendered inside the session provider
fn shell_body(auth: &AuthConfiguration, callback_url: &str) -> Element {
    Element::Fragment(Vec::new())
        .child(Element::component(AccountHeader::new(auth, callback_url)))
        .child(Element::node("main").attr("id", "app"))
}

fn document(body: Element) -> Element {
    Element::node("html")
        .attr("lang", "en")
        .child(
            Element::node("head")
                .child(Element::node("meta").attr("charset", "utf-8"))
                .child(Element::node("title").child(Element::text(env!("CARGO_PKG_NAME")))),
        )
        .child(Element::node("body").child(body))
}

/// GET /
///
/// Resolves the caller's session through the engine and renders the shell
/// inside a session provider. `?callbackUrl=` is carried into the sign-in
/// links when it is local or on an allowed origin.
pub async fn shell(
    State(state): State<AppState>,
    Query(query): Query<ShellQuery>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    // Session queries are GET requests to the engine
    let session = match state.auth.get.session(&headers).await {
        Ok(session) => SessionState::from_lookup(session),
        Err(error) => {
            tracing::warn!(%error, "Session lookup failed; rendering signed out");
            SessionState::Unauthenticated
        }
    };

    let auth = &state.config.auth;
    let callback_url = auth.resolve_callback(query.callback_url.as_deref());

    let hub = Arc::new(SessionHub::new(session));
    let provider = SessionContextProvider::new(hub)
        .children(shell_body(auth, callback_url))
        .mount();

    let html = document(provider.render()).render_html()?;
    provider.unmount();

    Ok(Html(format!("<!DOCTYPE html>{html}")))
}
