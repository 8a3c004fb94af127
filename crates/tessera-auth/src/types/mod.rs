//! Lookup data the core reads but does not own.

pub mod client;
pub mod refresh_token;
pub mod user;

pub use client::{Client, ClientValidationError, OOB_REDIRECT_URI, is_public_redirect_url};
pub use refresh_token::RefreshToken;
pub use user::{RemoteIdentity, User};
