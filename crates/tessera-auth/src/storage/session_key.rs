//! One-time session key storage trait.
//!
//! A session key carries a session reference across a redirect boundary.
//! It is the connector correlation token and, once the session is
//! authenticated, the authorization code.
//!
//! # Atomicity
//!
//! `pop` is the only thing standing between an authorization code and its
//! replay. Two concurrent pops of one key must yield exactly one success.
//! Implement it as a single take (remove-if-present returning the value),
//! never as a read followed by a delete.

use async_trait::async_trait;
use std::time::Duration;

use crate::AuthResult;

#[async_trait]
pub trait SessionKeyStorage: Send + Sync {
    /// Stores `key` pointing at `session_id` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key already exists or the backend fails.
    async fn push(&self, key: &str, session_id: &str, ttl: Duration) -> AuthResult<()>;

    /// Atomically removes `key` and returns its session ID.
    ///
    /// Returns `None` if the key never existed, was already popped or has
    /// expired. An expired key is removed as a side effect.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend fails.
    async fn pop(&self, key: &str) -> AuthResult<Option<String>>;

    /// Deletes expired keys and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn purge(&self) -> AuthResult<u64>;
}
