//! In-memory storage backend for the Tessera identity provider.
//!
//! Implements every storage trait of `tessera-auth` on top of
//! [`dashmap::DashMap`]. Nothing survives a restart; suited to development,
//! tests and single-instance deployments.
//!
//! # Example
//!
//! ```ignore
//! use tessera_db_memory::MemoryStores;
//!
//! let stores = MemoryStores::new();
//! stores.clients.insert(client)?;
//! ```

pub mod client;
pub mod refresh_token;
pub mod session;
pub mod user;

use std::sync::Arc;

pub use client::MemoryClientStorage;
pub use refresh_token::MemoryRefreshTokenStorage;
pub use session::{MemorySessionKeyStorage, MemorySessionStorage};
pub use user::MemoryUserStorage;

/// One of each store, shareable.
#[derive(Clone, Default)]
pub struct MemoryStores {
    pub sessions: Arc<MemorySessionStorage>,
    pub session_keys: Arc<MemorySessionKeyStorage>,
    pub clients: Arc<MemoryClientStorage>,
    pub users: Arc<MemoryUserStorage>,
    pub refresh_tokens: Arc<MemoryRefreshTokenStorage>,
}

impl MemoryStores {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
