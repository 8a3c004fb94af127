//! Client secret hashing.
//!
//! Registered clients keep only an Argon2id PHC string of their secret.
//! Verification runs the same Argon2 work whether or not there is a stored
//! hash to check against, so a response time does not reveal whether a
//! client ID exists.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hashes `secret` with Argon2id and a random salt.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails.
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks `secret` against a stored PHC `hash`.
///
/// # Errors
///
/// Returns an error only if `hash` is not a valid PHC string.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Hash of a random value nobody knows.
static DECOY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    let decoy = hex::encode(rand::random::<[u8; 32]>());
    hash_secret(&decoy).ok()
});

/// Spends the cost of one verification without anything to verify against.
/// Always `false`.
pub fn verify_against_decoy(secret: &str) -> bool {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = verify_secret(secret, hash);
    }
    false
}
