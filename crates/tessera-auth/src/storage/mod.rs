//! Storage traits for sessions, one-time keys, clients, users and refresh
//! tokens.
//!
//! The core consumes these interfaces and never depends on a storage
//! engine. Implementations live in separate crates:
//!
//! - `tessera-db-memory` - in-process maps for tests and single-node setups

pub mod client;
pub mod refresh_token;
pub mod session;
pub mod session_key;
pub mod user;

pub use client::ClientStorage;
pub use refresh_token::RefreshTokenStorage;
pub use session::SessionStorage;
pub use session_key::SessionKeyStorage;
pub use user::UserStorage;
