//! Token endpoint wire types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - exchange a one-time code for an ID token
//! - `refresh_token` - mint a new ID token from a refresh token
//! - `client_credentials` - ID token about the client itself

use serde::{Deserialize, Serialize};
use std::fmt;

/// Form body of `POST /token`. Client credentials come from HTTP Basic auth.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    /// Echoed back on errors.
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Narrowed scope for `refresh_token`, requested scope for
    /// `client_credentials`.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Grant types the endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
    ClientCredentials,
}

impl GrantType {
    /// Parses a `grant_type` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            "client_credentials" => Some(Self::ClientCredentials),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Successful token response.
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "id_token": "eyJhbG...",
///   "token_type": "bearer",
///   "expires_in": 3600,
///   "refresh_token": "abc123..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Same JWT as `id_token`.
    pub access_token: String,
    pub id_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(id_token: String, expires_in: u64) -> Self {
        Self {
            access_token: id_token.clone(),
            id_token,
            token_type: "bearer".to_string(),
            expires_in,
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }
}

/// Token error body: `{"error": ..., "state": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl TokenErrorBody {
    #[must_use]
    pub fn new(error: &str, state: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            state: state.filter(|s| !s.is_empty()),
        }
    }
}
