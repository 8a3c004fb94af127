//! Identity provider configuration.
//!
//! Lifetimes for sessions, one-time keys and tokens, grant toggles and the
//! signing-key rotation schedule.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root configuration of the identity provider core.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://id.example.com/dex"
/// local_connector_id = "local"
///
/// [auth.session]
/// session_lifetime = "5m"
/// session_key_lifetime = "10m"
///
/// [auth.oauth]
/// id_token_lifetime = "1h"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Public issuer URL. Its path is the base path of every endpoint.
    pub issuer: String,

    /// Connector that handles first-party registration.
    pub local_connector_id: String,

    /// Session and session-key settings.
    pub session: SessionConfig,

    /// Token endpoint settings.
    pub oauth: OAuthConfig,

    /// Signing key rotation.
    pub keys: KeyConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://127.0.0.1:5556".to_string(),
            local_connector_id: "local".to_string(),
            session: SessionConfig::default(),
            oauth: OAuthConfig::default(),
            keys: KeyConfig::default(),
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long an authentication attempt stays usable.
    #[serde(with = "humantime_serde")]
    pub session_lifetime: Duration,

    /// How long a one-time session key (connector correlation key or
    /// authorization code) stays poppable.
    #[serde(with = "humantime_serde")]
    pub session_key_lifetime: Duration,

    /// Interval of the expired-record purge task.
    #[serde(with = "humantime_serde")]
    pub purge_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_lifetime: Duration::from_secs(5 * 60),
            session_key_lifetime: Duration::from_secs(10 * 60),
            purge_interval: Duration::from_secs(60),
        }
    }
}

/// Token endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Lifetime of issued ID tokens.
    #[serde(with = "humantime_serde")]
    pub id_token_lifetime: Duration,

    /// Lifetime of refresh tokens.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Issue refresh tokens when `offline_access` is granted.
    pub enable_refresh_tokens: bool,

    /// Accept `grant_type=client_credentials`.
    pub enable_client_credentials: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            id_token_lifetime: Duration::from_secs(3600),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600),
            enable_refresh_tokens: true,
            enable_client_credentials: true,
        }
    }
}

/// Signing key rotation schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyConfig {
    /// How long a signing key stays active.
    #[serde(with = "humantime_serde")]
    pub rotation_interval: Duration,

    /// A key is rotated once its expiry is closer than this.
    #[serde(with = "humantime_serde")]
    pub expiry_grace: Duration,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            rotation_interval: Duration::from_secs(24 * 3600),
            expiry_grace: Duration::from_secs(3600),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the issuer is empty or not an absolute
    /// http(s) URL, or if any lifetime is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("auth.issuer".to_string()));
        }
        self.issuer_url()?;

        if self.local_connector_id.is_empty() {
            return Err(ConfigError::Missing("auth.local_connector_id".to_string()));
        }

        let lifetimes = [
            ("session.session_lifetime", self.session.session_lifetime),
            ("session.session_key_lifetime", self.session.session_key_lifetime),
            ("session.purge_interval", self.session.purge_interval),
            ("oauth.id_token_lifetime", self.oauth.id_token_lifetime),
            ("oauth.refresh_token_lifetime", self.oauth.refresh_token_lifetime),
            ("keys.rotation_interval", self.keys.rotation_interval),
        ];
        for (name, value) in lifetimes {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
        }

        if self.keys.expiry_grace >= self.keys.rotation_interval {
            return Err(ConfigError::InvalidValue(
                "keys.expiry_grace must be shorter than keys.rotation_interval".to_string(),
            ));
        }

        Ok(())
    }

    /// Parses the issuer.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when the issuer is not an
    /// http(s) URL.
    pub fn issuer_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.issuer)
            .map_err(|e| ConfigError::InvalidValue(format!("auth.issuer: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidValue(format!(
                "auth.issuer must use http or https, got '{other}'"
            ))),
        }
    }
}
