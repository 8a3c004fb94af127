//! Token exchange controller.
//!
//! Turns a one-time authorization code, a refresh token or bare client
//! credentials into a signed ID token. Every failure after client
//! authentication surfaces as `invalid_grant` so a replayed code looks the
//! same as one that never existed.

use std::sync::Arc;

use time::OffsetDateTime;

use super::token::TokenResponse;
use crate::config::OAuthConfig;
use crate::scope::{SCOPE_EMAIL, SCOPE_GROUPS, SCOPE_OFFLINE_ACCESS, SCOPE_PROFILE, Scopes};
use crate::scope::{cross_client_ids, validate_scopes};
use crate::session::SessionManager;
use crate::storage::{ClientStorage, RefreshTokenStorage, UserStorage};
use crate::token::{Audience, IdTokenClaims, KeyManager};
use crate::types::{Client, RefreshToken, User};
use crate::{AuthError, AuthResult};

pub struct TokenExchange {
    clients: Arc<dyn ClientStorage>,
    users: Arc<dyn UserStorage>,
    sessions: Arc<SessionManager>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    keys: Arc<dyn KeyManager>,
    issuer: String,
    config: OAuthConfig,
}

impl TokenExchange {
    pub fn new(
        clients: Arc<dyn ClientStorage>,
        users: Arc<dyn UserStorage>,
        sessions: Arc<SessionManager>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
        keys: Arc<dyn KeyManager>,
        issuer: impl Into<String>,
        config: OAuthConfig,
    ) -> Self {
        Self {
            clients,
            users,
            sessions,
            refresh_tokens,
            keys,
            issuer: issuer.into(),
            config,
        }
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Checks HTTP Basic client credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClient` for an unknown client or a wrong
    /// secret, without saying which.
    pub async fn authenticate(&self, client_id: &str, secret: &str) -> AuthResult<Client> {
        self.clients
            .authenticate(client_id, secret)
            .await?
            .ok_or_else(|| AuthError::invalid_client("client authentication failed"))
    }

    /// Redeems an authorization code.
    ///
    /// The code is popped before anything else is checked, so a second
    /// attempt fails whatever the outcome of the first. The session is
    /// killed as soon as it is found.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGrant` if the code is unknown, used or
    /// expired, belongs to another client, or its session is not
    /// authenticated.
    pub async fn exchange_code(&self, client: &Client, code: &str) -> AuthResult<TokenResponse> {
        let session_id = self.sessions.exchange_key(code).await.map_err(as_grant_error)?;
        let session = self.sessions.kill(&session_id).await.map_err(as_grant_error)?;

        if session.client_id != client.id {
            tracing::warn!(
                session_id = %session.id,
                client_id = %client.id,
                "code presented by a client it was not issued to"
            );
            return Err(AuthError::invalid_grant("invalid code"));
        }
        if !session.is_redeemable() {
            tracing::debug!(session_id = %session.id, state = %session.state, "session not redeemable");
            return Err(AuthError::invalid_grant("invalid code"));
        }
        let Some(user_id) = session.user_id.as_deref() else {
            return Err(AuthError::invalid_grant("invalid code"));
        };
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("invalid code"))?;

        let claims = self.claims(
            &client.id,
            &user.id,
            Some(&user),
            &session.scope,
            &session.groups,
            session.nonce.clone(),
        );
        let mut response = self.sign(&claims)?;

        if self.config.enable_refresh_tokens && session.has_scope(SCOPE_OFFLINE_ACCESS) {
            let token = self
                .issue_refresh_token(&client.id, &user.id, &session.scope, &session.groups)
                .await?;
            response = response.with_refresh_token(token);
        }

        tracing::info!(client_id = %client.id, user_id = %user.id, "code exchanged");
        Ok(response)
    }

    /// Mints a new ID token from a refresh token. A `scope` narrows the
    /// original grant and may not widen it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedGrantType` when refresh is disabled,
    /// `AuthError::InvalidGrant` for an unknown, revoked, expired or foreign
    /// token, and `AuthError::InvalidScope` for a widened scope.
    pub async fn refresh(
        &self,
        client: &Client,
        token: &str,
        scope: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        if !self.config.enable_refresh_tokens {
            return Err(AuthError::unsupported_grant_type("refresh_token"));
        }

        let record = self
            .refresh_tokens
            .find_by_hash(&RefreshToken::hash_token(token))
            .await?
            .filter(|record| record.client_id == client.id && record.is_valid())
            .ok_or_else(|| AuthError::invalid_grant("invalid refresh token"))?;

        let scopes = match scope.map(Scopes::parse).filter(|s| !s.is_empty()) {
            Some(requested) => {
                if let Some(extra) = requested
                    .as_slice()
                    .iter()
                    .find(|s| !record.scopes.contains(s))
                {
                    return Err(AuthError::invalid_scope(format!(
                        "scope {extra} was not originally granted"
                    )));
                }
                requested.into_vec()
            }
            None => record.scopes.clone(),
        };

        let user = self
            .users
            .find_by_id(&record.user_id)
            .await?
            .filter(|user| !user.disabled)
            .ok_or_else(|| AuthError::invalid_grant("invalid refresh token"))?;

        let claims = self.claims(&client.id, &user.id, Some(&user), &scopes, &record.groups, None);
        tracing::info!(client_id = %client.id, user_id = %user.id, "refresh token used");
        self.sign(&claims)
    }

    /// Mints an ID token about the client itself.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedGrantType` when disabled and
    /// `AuthError::InvalidScope` for scopes that need a user.
    pub async fn client_credentials(
        &self,
        client: &Client,
        scope: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        if !self.config.enable_client_credentials {
            return Err(AuthError::unsupported_grant_type("client_credentials"));
        }

        let scopes = Scopes::parse(scope.filter(|s| !s.is_empty()).unwrap_or("openid"));
        validate_scopes(&client.id, &scopes, self.clients.as_ref()).await?;
        if scopes.contains(SCOPE_OFFLINE_ACCESS) {
            return Err(AuthError::invalid_scope(
                "offline_access requires an authorization code",
            ));
        }

        let claims = self.claims(&client.id, &client.id, None, scopes.as_slice(), &[], None);
        tracing::info!(client_id = %client.id, "client credentials token issued");
        self.sign(&claims)
    }

    fn sign(&self, claims: &IdTokenClaims) -> AuthResult<TokenResponse> {
        let token = self.keys.sign(claims)?;
        Ok(TokenResponse::new(
            token,
            self.config.id_token_lifetime.as_secs(),
        ))
    }

    fn claims(
        &self,
        client_id: &str,
        subject: &str,
        user: Option<&User>,
        scopes: &[String],
        groups: &[String],
        nonce: Option<String>,
    ) -> IdTokenClaims {
        let now = OffsetDateTime::now_utc();
        let has = |scope: &str| scopes.iter().any(|s| s == scope);

        let mut audience = vec![client_id.to_string()];
        for peer in cross_client_ids(scopes) {
            if !audience.iter().any(|a| a == peer) {
                audience.push(peer.to_string());
            }
        }
        let (aud, azp) = if audience.len() == 1 {
            (Audience::Single(client_id.to_string()), None)
        } else {
            (Audience::Multiple(audience), Some(client_id.to_string()))
        };

        let email = user
            .filter(|_| has(SCOPE_EMAIL))
            .and_then(|u| u.email.clone().map(|email| (email, u.email_verified)));

        IdTokenClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            aud,
            exp: (now + self.config.id_token_lifetime).unix_timestamp(),
            iat: now.unix_timestamp(),
            nonce,
            azp,
            email_verified: email.as_ref().map(|(_, verified)| *verified),
            email: email.map(|(email, _)| email),
            name: user
                .filter(|_| has(SCOPE_PROFILE))
                .and_then(|u| u.display_name.clone()),
            groups: has(SCOPE_GROUPS).then(|| groups.to_vec()),
        }
    }

    async fn issue_refresh_token(
        &self,
        client_id: &str,
        user_id: &str,
        scopes: &[String],
        groups: &[String],
    ) -> AuthResult<String> {
        let token = RefreshToken::generate_token();
        let now = OffsetDateTime::now_utc();
        let record = RefreshToken {
            id: uuid::Uuid::new_v4(),
            token_hash: RefreshToken::hash_token(&token),
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            scopes: scopes.to_vec(),
            groups: groups.to_vec(),
            created_at: now,
            expires_at: now + self.config.refresh_token_lifetime,
            revoked_at: None,
        };
        self.refresh_tokens.create(&record).await?;
        Ok(token)
    }
}

/// Missing keys and sessions look like any other bad code.
fn as_grant_error(err: AuthError) -> AuthError {
    match err {
        AuthError::NotFound { .. } | AuthError::InvalidState { .. } => {
            AuthError::invalid_grant("invalid code")
        }
        other => other,
    }
}
