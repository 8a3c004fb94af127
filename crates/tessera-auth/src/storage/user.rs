//! User lookup trait used to map remote identities to local accounts.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{RemoteIdentity, User};

#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<User>>;

    /// Finds the user linked to a remote identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn find_by_remote_identity(&self, identity: &RemoteIdentity) -> AuthResult<Option<User>>;

    /// Finds a user by email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Links a remote identity to an existing user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the user does not exist, or an
    /// error if the identity is already linked to another user.
    async fn add_remote_identity(&self, user_id: &str, identity: &RemoteIdentity)
    -> AuthResult<()>;

    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID or email is taken.
    async fn create(&self, user: &User) -> AuthResult<()>;
}
