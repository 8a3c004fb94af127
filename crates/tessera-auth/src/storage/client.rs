//! Client registry trait.

use async_trait::async_trait;

use crate::types::Client;
use crate::{AuthError, AuthResult, secret};

/// Read access to registered OAuth clients.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Finds a client by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Checks client credentials and returns the client on success.
    ///
    /// Unknown clients and wrong secrets both yield `None` and both cost
    /// one Argon2 verification, so callers cannot tell which check failed.
    /// The verification runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn authenticate(&self, client_id: &str, presented: &str) -> AuthResult<Option<Client>> {
        let client = self.find_by_id(client_id).await?;
        let presented = presented.to_string();
        tokio::task::spawn_blocking(move || match client {
            Some(client) => client.verify_secret(&presented).then_some(client),
            None => {
                secret::verify_against_decoy(&presented);
                None
            }
        })
        .await
        .map_err(|e| AuthError::internal(format!("client secret check failed: {e}")))
    }
}
