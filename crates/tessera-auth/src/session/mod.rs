//! Authentication sessions.
//!
//! A session is the server-side record of one authentication attempt. It
//! moves through [`SessionState`] in one direction only:
//!
//! ```text
//! New ──► Identified ──► Authenticated ──► Dead
//!  │           │                            ▲
//!  └───────────┴────────────────────────────┘ (kill)
//! ```
//!
//! `Identified` means a connector vouched for a remote identity but no
//! local user is bound yet (for example mid-registration). `Authenticated`
//! means a local user is bound and a code may be issued. `Dead` is
//! terminal.

mod keygen;
mod manager;

pub use keygen::{KeyGenerator, RandomKeyGenerator, SequentialKeyGenerator};
pub use manager::{NewSession, SessionManager};

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use url::Url;

/// Lifecycle state of a session. Ordering follows the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Just created.
    New,
    /// A connector returned a remote identity.
    Identified,
    /// A local user is bound.
    Authenticated,
    /// Consumed by a token exchange, killed, or expired.
    Dead,
}

impl SessionState {
    /// Returns the state as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Identified => "identified",
            Self::Authenticated => "authenticated",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity claims a connector verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Subject at the connector.
    pub id: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// When the upstream authentication stops being valid.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl Identity {
    /// Creates an identity with only a subject.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            expires_at: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One authentication attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque unique identifier.
    pub id: String,

    /// Lifecycle state.
    pub state: SessionState,

    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the session stops being usable. Always after `created_at`.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Client that started the flow.
    pub client_id: String,

    /// Opaque state echoed back to the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_state: Option<String>,

    /// Resolved redirect URL.
    pub redirect_url: Url,

    /// Connector handling authentication.
    pub connector_id: String,

    /// Set once the session is `Identified`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,

    /// Set once the session is `Authenticated`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// First-time registration flow.
    #[serde(default)]
    pub register: bool,

    /// OIDC nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Requested scopes.
    #[serde(default)]
    pub scope: Vec<String>,

    /// Group memberships reported by the connector.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Session {
    /// Returns `true` if the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if the session may be redeemed for tokens.
    #[must_use]
    pub fn is_redeemable(&self) -> bool {
        self.state == SessionState::Authenticated && self.user_id.is_some() && !self.is_expired()
    }

    /// Returns `true` if the requested scopes include `scope`.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.iter().any(|s| s == scope)
    }
}
