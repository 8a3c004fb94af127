//! Refresh token records.
//!
//! Only a SHA-256 hash of a refresh token is ever stored. The plaintext is
//! handed to the client once and looked up by hashing what it presents.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// A stored refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Record identifier.
    pub id: Uuid,

    /// SHA-256 hash (hex) of the token value.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// User the token acts for.
    pub user_id: String,

    /// Granted scopes.
    pub scopes: Vec<String>,

    /// Group memberships captured at login.
    #[serde(default)]
    pub groups: Vec<String>,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the token stops working.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the token was revoked.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Returns `true` if the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if this token is neither expired nor revoked.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.revoked_at.is_none() && !self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Hashes a token value for storage and lookup.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Generates a 256-bit random token, base64url encoded (43 characters).
    #[must_use]
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn token(expires_at: OffsetDateTime, revoked_at: Option<OffsetDateTime>) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshToken::hash_token("t"),
            client_id: "app".to_string(),
            user_id: "u1".to_string(),
            scopes: vec!["openid".to_string(), "offline_access".to_string()],
            groups: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at,
        }
    }

    #[test]
    fn test_hash_token() {
        let hash = RefreshToken::hash_token("test-token-value");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, RefreshToken::hash_token("test-token-value"));
        assert_ne!(hash, RefreshToken::hash_token("other"));
    }

    #[test]
    fn test_generate_token() {
        let token = RefreshToken::generate_token();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(token, RefreshToken::generate_token());
    }

    #[test]
    fn test_validity() {
        let now = OffsetDateTime::now_utc();
        assert!(token(now + Duration::hours(1), None).is_valid());
        assert!(!token(now - Duration::seconds(1), None).is_valid());
        assert!(!token(now + Duration::hours(1), Some(now)).is_valid());
    }
}
