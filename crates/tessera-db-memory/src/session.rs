//! Sessions and one-time session keys.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tessera_auth::storage::{SessionKeyStorage, SessionStorage};
use tessera_auth::{AuthError, AuthResult, Session, SessionState};
use time::OffsetDateTime;

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        match self.sessions.entry(session.id.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!(
                "session {} already exists",
                session.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> AuthResult<Option<Session>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .sessions
            .get(id)
            .filter(|s| !s.is_expired_at(now))
            .map(|s| s.value().clone()))
    }

    async fn update(&self, session: &Session) -> AuthResult<()> {
        match self.sessions.get_mut(&session.id) {
            Some(mut stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(AuthError::not_found(format!("session {}", session.id))),
        }
    }

    async fn purge(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| s.state != SessionState::Dead && !s.is_expired_at(now));
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}

#[derive(Debug, Clone)]
struct KeyEntry {
    session_id: String,
    expires_at: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct MemorySessionKeyStorage {
    keys: DashMap<String, KeyEntry>,
}

impl MemorySessionKeyStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl SessionKeyStorage for MemorySessionKeyStorage {
    async fn push(&self, key: &str, session_id: &str, ttl: Duration) -> AuthResult<()> {
        let expires_at = OffsetDateTime::now_utc() + ttl;
        match self.keys.entry(key.to_string()) {
            Entry::Occupied(_) => Err(AuthError::storage("session key already exists")),
            Entry::Vacant(slot) => {
                slot.insert(KeyEntry {
                    session_id: session_id.to_string(),
                    expires_at,
                });
                Ok(())
            }
        }
    }

    async fn pop(&self, key: &str) -> AuthResult<Option<String>> {
        // `remove` takes the shard lock once, so only one caller gets the entry.
        let Some((_, entry)) = self.keys.remove(key) else {
            return Ok(None);
        };
        if entry.expires_at <= OffsetDateTime::now_utc() {
            tracing::debug!(session_id = %entry.session_id, "expired session key popped");
            return Ok(None);
        }
        Ok(Some(entry.session_id))
    }

    async fn purge(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.keys.len();
        self.keys.retain(|_, entry| entry.expires_at > now);
        Ok(before.saturating_sub(self.keys.len()) as u64)
    }
}
