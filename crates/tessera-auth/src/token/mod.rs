//! ID tokens and the keys that sign them.

pub mod jwt;
pub mod keys;

pub use jwt::{Audience, IdTokenClaims, Jwk, Jwks, JwtError, SigningKeyPair, verify_id_token};
pub use keys::{KeyManager, KeySet, RotatingKeyManager};
