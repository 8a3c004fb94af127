//! Signing key management.
//!
//! The token endpoint signs with the active key and the keys endpoint
//! publishes the verification set. Both read the same [`KeySet`] snapshot,
//! which a rotation replaces atomically.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use time::OffsetDateTime;

use super::jwt::{IdTokenClaims, JwtError, Jwks, SigningKeyPair, verify_id_token};

/// One generation of signing keys.
#[derive(Debug)]
pub struct KeySet {
    /// Key used for new signatures.
    pub active: Arc<SigningKeyPair>,
    /// Retired keys still published so outstanding tokens verify.
    pub previous: Vec<Arc<SigningKeyPair>>,
    /// When this set should be replaced.
    pub expires_at: OffsetDateTime,
}

impl KeySet {
    /// All keys that verify, active first.
    pub fn verification_keys(&self) -> impl Iterator<Item = &SigningKeyPair> {
        std::iter::once(self.active.as_ref()).chain(self.previous.iter().map(Arc::as_ref))
    }

    /// Public keys as a JWKS document.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: self.verification_keys().map(SigningKeyPair::to_jwk).collect(),
        }
    }
}

/// Source of the current key set.
pub trait KeyManager: Send + Sync {
    /// The current snapshot.
    fn key_set(&self) -> Arc<KeySet>;

    /// Signs `claims` with the active key.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    fn sign(&self, claims: &IdTokenClaims) -> Result<String, JwtError> {
        self.key_set().active.sign(claims)
    }

    /// Verifies a token issued by `issuer` against the published keys.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or validation fails.
    fn verify(&self, token: &str, issuer: &str) -> Result<IdTokenClaims, JwtError> {
        let set = self.key_set();
        verify_id_token(token, set.verification_keys(), issuer)
    }

    /// Public verification keys.
    fn public_keys(&self) -> Jwks {
        self.key_set().jwks()
    }

    /// When the current set expires.
    fn expires_at(&self) -> OffsetDateTime {
        self.key_set().expires_at
    }
}

/// Key manager that generates a fresh RSA key every `rotation_interval`,
/// keeping the previous public key published for one more generation.
pub struct RotatingKeyManager {
    current: ArcSwap<KeySet>,
    rotation_interval: Duration,
    expiry_grace: Duration,
}

impl RotatingKeyManager {
    /// Generates the first key.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate(rotation_interval: Duration, expiry_grace: Duration) -> Result<Self, JwtError> {
        let key = SigningKeyPair::generate_rsa()?;
        Ok(Self::with_key(key, rotation_interval, expiry_grace))
    }

    /// Starts from an existing key.
    #[must_use]
    pub fn with_key(
        key: SigningKeyPair,
        rotation_interval: Duration,
        expiry_grace: Duration,
    ) -> Self {
        let set = KeySet {
            active: Arc::new(key),
            previous: Vec::new(),
            expires_at: OffsetDateTime::now_utc() + rotation_interval,
        };
        Self {
            current: ArcSwap::from_pointee(set),
            rotation_interval,
            expiry_grace,
        }
    }

    /// Installs `key` as active and retires the old one.
    pub fn rotate_to(&self, key: SigningKeyPair) {
        let old = self.current.load_full();
        let next = KeySet {
            active: Arc::new(key),
            previous: vec![Arc::clone(&old.active)],
            expires_at: OffsetDateTime::now_utc() + self.rotation_interval,
        };
        tracing::info!(
            kid = %next.active.kid,
            retired_kid = %old.active.kid,
            "signing key rotated"
        );
        self.current.store(Arc::new(next));
    }

    /// Generates and installs a new key.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn rotate(&self) -> Result<(), JwtError> {
        self.rotate_to(SigningKeyPair::generate_rsa()?);
        Ok(())
    }

    /// Rotates when the current set is within the grace window of its
    /// expiry. Returns whether a rotation happened.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn rotate_if_due(&self, now: OffsetDateTime) -> Result<bool, JwtError> {
        if now + self.expiry_grace < self.current.load().expires_at {
            return Ok(false);
        }
        self.rotate()?;
        Ok(true)
    }
}

impl KeyManager for RotatingKeyManager {
    fn key_set(&self) -> Arc<KeySet> {
        self.current.load_full()
    }
}
