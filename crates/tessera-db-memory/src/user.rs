//! Users and their linked remote identities.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tessera_auth::storage::UserStorage;
use tessera_auth::{AuthError, AuthResult, RemoteIdentity, User};

#[derive(Debug, Default)]
pub struct MemoryUserStorage {
    users: DashMap<String, User>,
    /// `(connector_id, remote id)` -> user ID.
    remote: DashMap<(String, String), String>,
    /// Lowercased email -> user ID.
    emails: DashMap<String, String>,
}

impl MemoryUserStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a stored user, e.g. to disable it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` for an unknown user.
    pub fn update(&self, user: User) -> AuthResult<()> {
        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AuthError::not_found(format!("user {}", user.id)))?;
        if let Some(old) = stored.email.as_deref() {
            self.emails.remove(&old.to_lowercase());
        }
        if let Some(email) = user.email.as_deref() {
            self.emails.insert(email.to_lowercase(), user.id.clone());
        }
        *stored = user;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStorage for MemoryUserStorage {
    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<User>> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn find_by_remote_identity(&self, identity: &RemoteIdentity) -> AuthResult<Option<User>> {
        let key = (identity.connector_id.clone(), identity.id.clone());
        let Some(user_id) = self.remote.get(&key).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        self.find_by_id(&user_id).await
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let Some(user_id) = self
            .emails
            .get(&email.to_lowercase())
            .map(|id| id.value().clone())
        else {
            return Ok(None);
        };
        self.find_by_id(&user_id).await
    }

    async fn add_remote_identity(
        &self,
        user_id: &str,
        identity: &RemoteIdentity,
    ) -> AuthResult<()> {
        if !self.users.contains_key(user_id) {
            return Err(AuthError::not_found(format!("user {user_id}")));
        }
        match self
            .remote
            .entry((identity.connector_id.clone(), identity.id.clone()))
        {
            Entry::Occupied(linked) if linked.get() != user_id => Err(AuthError::storage(format!(
                "remote identity {}/{} is linked to another user",
                identity.connector_id, identity.id
            ))),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(user_id.to_string());
                Ok(())
            }
        }
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        if let Some(email) = user.email.as_deref() {
            if self.emails.contains_key(&email.to_lowercase()) {
                return Err(AuthError::storage(format!("email {email} is taken")));
            }
        }
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!("user {} exists", user.id))),
            Entry::Vacant(slot) => {
                if let Some(email) = user.email.as_deref() {
                    self.emails.insert(email.to_lowercase(), user.id.clone());
                }
                slot.insert(user.clone());
                Ok(())
            }
        }
    }
}
