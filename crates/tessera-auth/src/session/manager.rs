use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use url::Url;

use super::{Identity, KeyGenerator, RandomKeyGenerator, Session, SessionState};
use crate::storage::{SessionKeyStorage, SessionStorage};
use crate::{AuthError, AuthResult};

/// Parameters of a freshly validated authorization request.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub connector_id: String,
    pub client_id: String,
    pub client_state: Option<String>,
    pub redirect_url: Url,
    pub scope: Vec<String>,
    pub nonce: Option<String>,
    pub register: bool,
}

/// Drives session state transitions on top of the session and session-key
/// stores.
///
/// Every transition reads the session, checks the source state and writes
/// it back. An expired session reads as absent, so no transition can
/// revive one.
pub struct SessionManager {
    sessions: Arc<dyn SessionStorage>,
    keys: Arc<dyn SessionKeyStorage>,
    generator: Arc<dyn KeyGenerator>,
    session_lifetime: Duration,
    key_lifetime: Duration,
}

impl SessionManager {
    /// Creates a manager using random identifiers.
    pub fn new(
        sessions: Arc<dyn SessionStorage>,
        keys: Arc<dyn SessionKeyStorage>,
        session_lifetime: Duration,
        key_lifetime: Duration,
    ) -> Self {
        Self {
            sessions,
            keys,
            generator: Arc::new(RandomKeyGenerator),
            session_lifetime,
            key_lifetime,
        }
    }

    /// Replaces the identifier source.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn KeyGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// How long a pushed key stays valid.
    #[must_use]
    pub fn key_lifetime(&self) -> Duration {
        self.key_lifetime
    }

    /// Creates a session in state `New` and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored.
    pub async fn new_session(&self, params: NewSession) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            id: self.generator.generate(),
            state: SessionState::New,
            created_at: now,
            expires_at: now + self.session_lifetime,
            client_id: params.client_id,
            client_state: params.client_state,
            redirect_url: params.redirect_url,
            connector_id: params.connector_id,
            identity: None,
            user_id: None,
            register: params.register,
            nonce: params.nonce,
            scope: params.scope,
            groups: Vec::new(),
        };

        self.sessions.create(&session).await?;
        tracing::debug!(
            session_id = %session.id,
            client_id = %session.client_id,
            connector_id = %session.connector_id,
            "session created"
        );
        Ok(session.id)
    }

    /// Pushes a new one-time key for the session and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be stored.
    pub async fn new_session_key(&self, session_id: &str) -> AuthResult<String> {
        let key = self.generator.generate();
        self.keys.push(&key, session_id, self.key_lifetime).await?;
        Ok(key)
    }

    /// Pops a one-time key and returns the session ID it pointed at.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the key is unknown, already used or
    /// expired.
    pub async fn exchange_key(&self, key: &str) -> AuthResult<String> {
        self.keys
            .pop(key)
            .await?
            .ok_or_else(|| AuthError::not_found("session key"))
    }

    /// Loads a live session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the session is missing or expired.
    pub async fn get(&self, session_id: &str) -> AuthResult<Session> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("session {session_id}")))
    }

    /// Binds a remote identity. Requires state `New`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidState` from any other state.
    pub async fn attach_remote_identity(
        &self,
        session_id: &str,
        identity: Identity,
    ) -> AuthResult<Session> {
        let mut session = self.get(session_id).await?;
        expect_state(&session, SessionState::New)?;
        session.identity = Some(identity);
        session.state = SessionState::Identified;
        self.sessions.update(&session).await?;
        Ok(session)
    }

    /// Binds a local user. Requires state `Identified`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidState` from any other state.
    pub async fn attach_user(&self, session_id: &str, user_id: &str) -> AuthResult<Session> {
        let mut session = self.get(session_id).await?;
        expect_state(&session, SessionState::Identified)?;
        session.user_id = Some(user_id.to_string());
        session.state = SessionState::Authenticated;
        self.sessions.update(&session).await?;
        Ok(session)
    }

    /// Records group memberships.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidState` if the session is dead.
    pub async fn add_groups(&self, session_id: &str, groups: Vec<String>) -> AuthResult<Session> {
        let mut session = self.get(session_id).await?;
        if session.state == SessionState::Dead {
            return Err(AuthError::invalid_state("session is dead"));
        }
        session.groups = groups;
        self.sessions.update(&session).await?;
        Ok(session)
    }

    /// Marks the session `Dead` and returns it as it was before.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the session is missing or expired.
    pub async fn kill(&self, session_id: &str) -> AuthResult<Session> {
        let before = self.get(session_id).await?;
        if before.state != SessionState::Dead {
            let mut dead = before.clone();
            dead.state = SessionState::Dead;
            self.sessions.update(&dead).await?;
        }
        Ok(before)
    }

    /// Purges expired or dead sessions and expired keys.
    ///
    /// # Errors
    ///
    /// Returns an error if either store fails.
    pub async fn purge(&self) -> AuthResult<(u64, u64)> {
        let sessions = self.sessions.purge().await?;
        let keys = self.keys.purge().await?;
        Ok((sessions, keys))
    }
}

fn expect_state(session: &Session, expected: SessionState) -> AuthResult<()> {
    if session.state == expected {
        Ok(())
    } else {
        Err(AuthError::invalid_state(format!(
            "session {} is {}, expected {expected}",
            session.id, session.state
        )))
    }
}
