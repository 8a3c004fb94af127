//! # tessera-auth
//!
//! Core of an OpenID Connect identity provider.
//!
//! This crate provides:
//! - the authorization endpoint and its session state machine
//! - the token endpoint (authorization code, refresh token, client credentials)
//! - RS256 ID token signing with rotating keys
//! - discovery and JWKS endpoints
//! - the connector interface for pluggable authentication backends
//!
//! ## Modules
//!
//! - [`config`] - Identity provider configuration
//! - [`connector`] - Authentication backend interface and registry
//! - [`session`] - Authorization sessions and one-time keys
//! - [`oauth`] - Request validation, authorization flow and token exchange
//! - [`scope`] - Scope parsing and cross-client rules
//! - [`secret`] - Argon2 client secret hashing
//! - [`token`] - ID token claims, signing keys and rotation
//! - [`storage`] - Storage traits for sessions, clients, users and tokens
//! - [`http`] - Axum handlers and router

pub mod config;
pub mod connector;
pub mod error;
pub mod http;
pub mod oauth;
pub mod scope;
pub mod secret;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, KeyConfig, OAuthConfig, SessionConfig};
pub use connector::{Connector, ConnectorContext, ConnectorRegistry, GroupsConnector, LoginCallback};
pub use error::{AuthError, ErrorCategory};
pub use http::{IdpState, router};
pub use oauth::{AuthorizationFlow, TokenExchange};
pub use session::{Identity, Session, SessionManager, SessionState};
pub use storage::{
    ClientStorage, RefreshTokenStorage, SessionKeyStorage, SessionStorage, UserStorage,
};
pub use token::{KeyManager, KeySet, RotatingKeyManager};
pub use types::{Client, ClientValidationError, RefreshToken, RemoteIdentity, User};

/// Type alias for identity provider results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tessera_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::connector::{Connector, ConnectorContext, ConnectorRegistry, LoginCallback};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{IdpState, router};
    pub use crate::oauth::{AuthorizationFlow, TokenExchange};
    pub use crate::session::{Identity, Session, SessionManager, SessionState};
    pub use crate::storage::{
        ClientStorage, RefreshTokenStorage, SessionKeyStorage, SessionStorage, UserStorage,
    };
    pub use crate::token::{KeyManager, RotatingKeyManager};
    pub use crate::types::{Client, RefreshToken, RemoteIdentity, User};
}
