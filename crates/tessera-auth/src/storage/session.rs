//! Session storage trait.
//!
//! # Implementation Notes
//!
//! Implementations should:
//!
//! - Treat an expired session as absent on every read
//! - Keep `update` safe against concurrent writers of the same ID
//! - Physically remove expired and dead sessions in `purge`

use async_trait::async_trait;

use crate::AuthResult;
use crate::session::Session;

/// Storage trait for authentication sessions.
///
/// A session is created when an authorization request passes validation
/// and is mutated as the flow advances. Writes for one session are
/// causally ordered by the protocol (identity, then user, then key), so
/// last-writer-wins is sufficient.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Stores a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if a session with the same ID already exists or
    /// the backend is unavailable.
    async fn create(&self, session: &Session) -> AuthResult<()>;

    /// Finds a session by ID.
    ///
    /// Returns `None` when the session does not exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend fails.
    async fn get(&self, id: &str) -> AuthResult<Option<Session>>;

    /// Replaces a stored session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the session does not exist.
    async fn update(&self, session: &Session) -> AuthResult<()>;

    /// Deletes expired and dead sessions.
    ///
    /// Returns the number of deleted sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn purge(&self) -> AuthResult<u64>;
}
