//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfiguration,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// Configuration handed to the authentication engine
///
/// The gateway itself only reads `base_path`; everything else is interpreted
/// by the engine selected in `engine`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfiguration {
    /// Path prefix the auth routes are mounted under (e.g. "/api/auth")
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Canonical public URL of the site, used for forwarded host/proto headers
    pub url: Option<String>,
    /// Which engine implementation answers auth requests
    #[serde(default)]
    pub engine: EngineKind,
    pub upstream: UpstreamConfig,
    /// Identity providers offered on sign-in
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub callbacks: CallbackConfig,
}

fn default_base_path() -> String {
    "/api/auth".to_string()
}

/// Engine selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Delegate to an external authentication service over HTTP
    #[default]
    Upstream,
}

/// Upstream authentication service
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL that auth actions are appended to
    /// e.g., "http://auth.internal:3000/api/auth"
    pub url: String,
    /// Per-request timeout in seconds (default: 10)
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
    /// Largest request body forwarded upstream (default: 1 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_upstream_timeout() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Identity provider entry
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Stable identifier used in action paths (`/signin/{id}`)
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Provider type: "oauth", "oidc", "email", "credentials"
    #[serde(default = "default_provider_kind")]
    pub kind: String,
}

fn default_provider_kind() -> String {
    "oauth".to_string()
}

/// Callback rules
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackConfig {
    /// Where users land after signing in (default: "/")
    #[serde(default = "default_sign_in_redirect")]
    pub sign_in_redirect: String,
    /// Absolute origins other than the site itself that redirects may target
    #[serde(default)]
    pub allowed_redirect_origins: Vec<String>,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            sign_in_redirect: default_sign_in_redirect(),
            allowed_redirect_origins: Vec::new(),
        }
    }
}

fn default_sign_in_redirect() -> String {
    "/".to_string()
}

/// Metrics endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Expose GET /metrics (default: true)
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> String {
        format!("authgate={0},tower_http={0}", self.level)
    }
}

impl AppConfig {
    /// Load configuration from `./config` and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (AUTHGATE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        Self::load_from(Path::new("config"))
    }

    /// Same as [`AppConfig::load`] with an explicit configuration directory
    pub fn load_from(dir: &Path) -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("auth.base_path", default_base_path())?
            .set_default("auth.engine", "upstream")?
            .set_default("auth.upstream.timeout_seconds", default_upstream_timeout())?
            .set_default("auth.upstream.max_body_bytes", default_max_body_bytes() as u64)?
            .set_default("metrics.enabled", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            // local overrides default
            .add_source(File::with_name(&dir.join("local").to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("AUTHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(crate::error::AppError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error, got {:?}",
                self.logging.level
            )));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        self.auth.validate()
    }
}

impl AuthConfiguration {
    /// Check the configuration before an engine is built from it
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        let base = self.base_path.as_str();
        if !base.starts_with('/') || base.len() < 2 || base.ends_with('/') {
            return Err(AppError::Config(format!(
                "auth.base_path must start with '/' and not end with '/', got {base:?}"
            )));
        }

        parse_http_url("auth.upstream.url", &self.upstream.url)?;
        if let Some(url) = &self.url {
            parse_http_url("auth.url", url)?;
        }

        if self.upstream.timeout_seconds == 0 {
            return Err(AppError::Config(
                "auth.upstream.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(AppError::Config(
                    "auth.providers[].id must not be empty".to_string(),
                ));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(AppError::Config(format!(
                    "auth.providers contains duplicate id {:?}",
                    provider.id
                )));
            }
        }

        for origin in &self.callbacks.allowed_redirect_origins {
            parse_http_url("auth.callbacks.allowed_redirect_origins[]", origin)?;
        }

        let redirect = &self.callbacks.sign_in_redirect;
        if !is_local_path(redirect) && !self.is_allowed_redirect(redirect) {
            return Err(AppError::Config(format!(
                "auth.callbacks.sign_in_redirect {redirect:?} is neither a path nor an allowed origin"
            )));
        }

        Ok(())
    }

    /// Whether an absolute URL points at one of the allowed redirect origins
    pub fn is_allowed_redirect(&self, target: &str) -> bool {
        let Ok(target) = url::Url::parse(target) else {
            return false;
        };

        self.allowed_redirect_origins()
            .any(|origin| origin == target.origin())
    }

    /// Where to send the user after sign-in
    ///
    /// A requested target is kept when it is a local path or points at an
    /// allowed origin; anything else falls back to `callbacks.sign_in_redirect`.
    pub fn resolve_callback<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(target) if is_local_path(target) || self.is_allowed_redirect(target) => target,
            Some(target) => {
                tracing::debug!(callback_url = target, "Ignoring callback URL outside the allowed origins");
                &self.callbacks.sign_in_redirect
            }
            None => &self.callbacks.sign_in_redirect,
        }
    }

    fn allowed_redirect_origins(&self) -> impl Iterator<Item = url::Origin> + '_ {
        self.url
            .iter()
            .chain(self.callbacks.allowed_redirect_origins.iter())
            .filter_map(|raw| url::Url::parse(raw).ok())
            .map(|url| url.origin())
    }
}

/// Same-site path; `//host` and `/\\host` are protocol-relative in browsers
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

fn parse_http_url(field: &str, raw: &str) -> Result<url::Url, crate::error::AppError> {
    let url = url::Url::parse(raw).map_err(|e| {
        crate::error::AppError::Config(format!("{field} is not a valid URL ({raw:?}): {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(crate::error::AppError::Config(format!(
            "{field} must use http or https, got {:?}",
            url.scheme()
        )));
    }

    Ok(url)
}
