use std::collections::BTreeMap;
use std::sync::Arc;

use super::Connector;
use crate::{AuthError, AuthResult};

/// Connectors available to this provider, built once at startup and shared
/// read-only afterwards.
pub struct ConnectorRegistry {
    connectors: BTreeMap<String, Arc<dyn Connector>>,
    local_id: String,
}

impl ConnectorRegistry {
    /// Creates an empty registry. `local_id` names the first-party
    /// connector that handles registration.
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            connectors: BTreeMap::new(),
            local_id: local_id.into(),
        }
    }

    /// Adds a connector.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the ID is empty or taken.
    pub fn register(&mut self, connector: Arc<dyn Connector>) -> AuthResult<()> {
        let id = connector.id().to_string();
        if id.is_empty() {
            return Err(AuthError::configuration("connector ID cannot be empty"));
        }
        if self.connectors.contains_key(&id) {
            return Err(AuthError::configuration(format!(
                "connector {id} registered twice"
            )));
        }
        tracing::info!(connector_id = %id, "connector registered");
        self.connectors.insert(id, connector);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn with(mut self, connector: Arc<dyn Connector>) -> AuthResult<Self> {
        self.register(connector)?;
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.get(id).cloned()
    }

    /// Returns `true` if `id` is the first-party connector.
    #[must_use]
    pub fn is_local(&self, id: &str) -> bool {
        id == self.local_id
    }

    #[must_use]
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Connector>> {
        self.connectors.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Health of every connector, keyed by ID. `None` means healthy.
    pub async fn health(&self) -> BTreeMap<String, Option<String>> {
        let mut report = BTreeMap::new();
        for (id, connector) in &self.connectors {
            let status = connector.healthy().await.err().map(|e| e.to_string());
            report.insert(id.clone(), status);
        }
        report
    }

    /// Calls `sync` on every connector. Failures are logged, not returned.
    pub async fn sync_all(&self) -> usize {
        let mut failures = 0;
        for (id, connector) in &self.connectors {
            if let Err(e) = connector.sync().await {
                failures += 1;
                tracing::warn!(connector_id = %id, error = %e, "connector sync failed");
            }
        }
        failures
    }
}
