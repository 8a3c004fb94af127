//! Local user accounts and their links to remote identities.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A local user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable user identifier; becomes the `sub` claim.
    pub id: String,

    /// Primary email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether `email` has been verified.
    #[serde(default)]
    pub email_verified: bool,

    /// Display name; becomes the `name` claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Disabled users cannot sign in.
    #[serde(default)]
    pub disabled: bool,

    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Creates an enabled user with no email.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            email_verified: false,
            display_name: None,
            disabled: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>, verified: bool) -> Self {
        self.email = Some(email.into());
        self.email_verified = verified;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// The identity a connector vouches for, keyed by connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIdentity {
    /// Connector that authenticated the user.
    pub connector_id: String,
    /// Subject at that connector.
    pub id: String,
}

impl RemoteIdentity {
    /// Creates a remote identity.
    #[must_use]
    pub fn new(connector_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
            id: id.into(),
        }
    }
}
