//! Client registry.

use async_trait::async_trait;
use dashmap::DashMap;
use tessera_auth::storage::ClientStorage;
use tessera_auth::{AuthError, AuthResult, Client};

#[derive(Debug, Default)]
pub struct MemoryClientStorage {
    clients: DashMap<String, Client>,
}

impl MemoryClientStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client after validating it and hashing its secret.
    /// Replaces an existing client with the same ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the client is invalid.
    pub fn insert(&self, client: Client) -> AuthResult<()> {
        client
            .validate()
            .map_err(|e| AuthError::configuration(format!("client {}: {e}", client.id)))?;
        let id = client.id.clone();
        let client = client
            .with_hashed_secret()
            .map_err(|e| AuthError::internal(format!("hashing secret of client {id}: {e}")))?;
        if self.clients.insert(client.id.clone(), client).is_some() {
            tracing::debug!("replaced existing client");
        }
        Ok(())
    }

    /// Registers every client in `clients`.
    ///
    /// # Errors
    ///
    /// Stops at the first invalid client.
    pub fn seed(&self, clients: impl IntoIterator<Item = Client>) -> AuthResult<usize> {
        let mut count = 0;
        for client in clients {
            self.insert(client)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn remove(&self, client_id: &str) -> Option<Client> {
        self.clients.remove(client_id).map(|(_, c)| c)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientStorage for MemoryClientStorage {
    async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }
}
