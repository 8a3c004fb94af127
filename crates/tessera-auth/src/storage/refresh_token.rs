//! Refresh token storage trait.
//!
//! Tokens are stored as SHA-256 hashes only; see
//! [`RefreshToken::hash_token`](crate::types::RefreshToken::hash_token).

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::RefreshToken;

#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a token by hash, including revoked and expired ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Marks a token as revoked.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if no such token exists.
    async fn revoke(&self, token_hash: &str) -> AuthResult<()>;

    /// Revokes every token issued to a client and returns how many.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64>;

    /// Deletes expired tokens and returns how many.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
