use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of session IDs and session keys.
pub trait KeyGenerator: Send + Sync {
    /// Returns a new opaque identifier.
    fn generate(&self) -> String;
}

/// 256 bits from the thread RNG, base64url encoded (43 characters).
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Yields `code-1`, `code-2`, ... Predictable, so only for tests and demos.
#[derive(Debug, Default)]
pub struct SequentialKeyGenerator {
    next: AtomicU64,
}

impl SequentialKeyGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyGenerator for SequentialKeyGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("code-{n}")
    }
}
