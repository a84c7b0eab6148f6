//! Session records
//!
//! The authentication engine owns sessions. The gateway only decodes the
//! engine's session document so it can hand a read-only copy to the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// User session data as reported by the engine's session query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Signed-in user, absent for sessions without profile data
    #[serde(default)]
    pub user: Option<SessionUser>,
    /// When session expires
    pub expires: DateTime<Utc>,
    /// Engine-specific fields, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Profile fields of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

impl Session {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires < Utc::now()
    }

    /// Name to greet the user with
    pub fn display_name(&self) -> Option<&str> {
        let user = self.user.as_ref()?;
        user.name.as_deref().or(user.email.as_deref())
    }

    /// Decode a session query response body
    ///
    /// `{}` and `null` mean "no session".
    pub fn from_document(body: &[u8]) -> Result<Option<Self>, AppError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| AppError::InvalidSession(e.to_string()))?;

        match &value {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => return Ok(None),
            _ => {}
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AppError::InvalidSession(e.to_string()))
    }
}

/// Session state as observed through a session context
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// No answer from the session source yet
    #[default]
    Loading,
    Authenticated(Session),
    Unauthenticated,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Expired sessions are reported as unauthenticated
    pub fn from_lookup(session: Option<Session>) -> Self {
        match session {
            Some(session) if !session.is_expired() => SessionState::Authenticated(session),
            _ => SessionState::Unauthenticated,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Unauthenticated => "unauthenticated",
        }
    }
}
