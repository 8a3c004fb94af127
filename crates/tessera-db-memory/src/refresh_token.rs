//! Refresh tokens, keyed by hash.

use async_trait::async_trait;
use dashmap::DashMap;
use tessera_auth::storage::RefreshTokenStorage;
use tessera_auth::{AuthError, AuthResult, RefreshToken};
use time::OffsetDateTime;

#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStorage {
    tokens: DashMap<String, RefreshToken>,
}

impl MemoryRefreshTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryRefreshTokenStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens.get(token_hash).map(|t| t.value().clone()))
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<()> {
        let mut token = self
            .tokens
            .get_mut(token_hash)
            .ok_or_else(|| AuthError::not_found("refresh token"))?;
        if token.revoked_at.is_none() {
            token.revoked_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut count = 0;
        for mut token in self.tokens.iter_mut() {
            if token.client_id == client_id && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.tokens.len();
        self.tokens.retain(|_, t| !t.is_expired_at(now));
        Ok(before.saturating_sub(self.tokens.len()) as u64)
    }
}
