//! Scope parsing and validation.
//!
//! Recognized scopes are `openid`, `profile`, `email`, `groups` and
//! `offline_access`. A token prefixed with [`CROSS_CLIENT_PREFIX`] asks for
//! an ID token whose audience includes the named client; the named client
//! must list the requester among its trusted peers, unless the requester
//! names itself.

use std::collections::HashSet;

use crate::storage::ClientStorage;
use crate::{AuthError, AuthResult};

pub const SCOPE_OPENID: &str = "openid";
pub const SCOPE_PROFILE: &str = "profile";
pub const SCOPE_EMAIL: &str = "email";
pub const SCOPE_GROUPS: &str = "groups";
pub const SCOPE_OFFLINE_ACCESS: &str = "offline_access";

/// Prefix of cross-client authorization scopes.
pub const CROSS_CLIENT_PREFIX: &str = "audience:server:client_id:";

const RECOGNIZED: [&str; 5] = [
    SCOPE_OPENID,
    SCOPE_PROFILE,
    SCOPE_EMAIL,
    SCOPE_GROUPS,
    SCOPE_OFFLINE_ACCESS,
];

/// Space-separated scope list, order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes(Vec<String>);

impl Scopes {
    /// Splits a `scope` parameter on whitespace.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(raw.split_whitespace().map(str::to_string).collect())
    }

    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }

    #[must_use]
    pub fn has_openid(&self) -> bool {
        self.contains(SCOPE_OPENID)
    }

    /// Client IDs named by cross-client scopes.
    pub fn cross_client_ids(&self) -> impl Iterator<Item = &str> {
        cross_client_ids(&self.0)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Scopes {
    fn from(scopes: Vec<String>) -> Self {
        Self(scopes)
    }
}

impl std::fmt::Display for Scopes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// Client IDs named by cross-client scopes in `scopes`.
pub fn cross_client_ids(scopes: &[String]) -> impl Iterator<Item = &str> {
    scopes
        .iter()
        .filter_map(|s| s.strip_prefix(CROSS_CLIENT_PREFIX))
}

/// Validates the scopes `client_id` asked for.
///
/// # Errors
///
/// Returns `AuthError::InvalidScope` if `openid` is missing, a scope is
/// repeated or unknown, a cross-client scope names no client, or the named
/// client does not trust the requester.
pub async fn validate_scopes(
    client_id: &str,
    scopes: &Scopes,
    clients: &dyn ClientStorage,
) -> AuthResult<()> {
    let mut seen = HashSet::new();
    for scope in scopes.as_slice() {
        if !seen.insert(scope.as_str()) {
            return Err(AuthError::invalid_scope(format!("duplicate scope {scope}")));
        }

        if let Some(peer_id) = scope.strip_prefix(CROSS_CLIENT_PREFIX) {
            check_cross_client(client_id, peer_id, clients).await?;
        } else if !RECOGNIZED.contains(&scope.as_str()) {
            return Err(AuthError::invalid_scope(format!("unrecognized scope {scope}")));
        }
    }

    if !scopes.has_openid() {
        return Err(AuthError::invalid_scope("missing required scope openid"));
    }

    Ok(())
}

async fn check_cross_client(
    client_id: &str,
    peer_id: &str,
    clients: &dyn ClientStorage,
) -> AuthResult<()> {
    if peer_id.is_empty() {
        return Err(AuthError::invalid_scope("cross-client scope names no client"));
    }
    if peer_id == client_id {
        return Ok(());
    }

    let peer = clients
        .find_by_id(peer_id)
        .await?
        .ok_or_else(|| AuthError::invalid_scope(format!("unknown client {peer_id}")))?;

    if peer.trusts(client_id) {
        Ok(())
    } else {
        tracing::debug!(client_id, peer_id, "cross-client scope not trusted");
        Err(AuthError::invalid_scope(format!(
            "client {peer_id} does not trust {client_id}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Client;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Clients(HashMap<String, Client>);

    #[async_trait]
    impl ClientStorage for Clients {
        async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
            Ok(self.0.get(client_id).cloned())
        }
    }

    fn clients() -> Clients {
        let a = Client::new("client_a", "a");
        let b = Client::new("client_b", "b").with_trusted_peer("client_a");
        let c = Client::new("client_c", "c").with_trusted_peer("client_a");
        Clients(
            [a, b, c]
                .into_iter()
                .map(|client| (client.id.clone(), client))
                .collect(),
        )
    }

    async fn check(client_id: &str, raw: &str) -> AuthResult<()> {
        validate_scopes(client_id, &Scopes::parse(raw), &clients()).await
    }

    fn cross(id: &str) -> String {
        format!("{CROSS_CLIENT_PREFIX}{id}")
    }

    #[tokio::test]
    async fn test_cross_client_scopes() {
        // Untrusted requester.
        assert!(check("XXX", &format!("openid {}", cross("client_a"))).await.is_err());
        // Naming oneself is allowed.
        assert!(check("client_a", &format!("openid {}", cross("client_a"))).await.is_ok());
        // client_b trusts client_a.
        assert!(check("client_a", &format!("openid {}", cross("client_b"))).await.is_ok());
        // Same target twice.
        let dup = format!("openid {} {}", cross("client_b"), cross("client_b"));
        assert!(matches!(check("client_a", &dup).await, Err(AuthError::InvalidScope { .. })));
        // Several distinct targets.
        let many = format!(
            "openid {} {} {}",
            cross("client_a"),
            cross("client_b"),
            cross("client_c")
        );
        assert!(check("client_a", &many).await.is_ok());
        // Cross-client alone is not enough.
        assert!(check("client_a", &cross("client_b")).await.is_err());
    }

    #[tokio::test]
    async fn test_recognized_scopes() {
        assert!(check("client_a", "openid profile email groups offline_access").await.is_ok());
        assert!(check("client_a", "openid admin").await.is_err());
        assert!(check("client_a", "openid openid").await.is_err());
        assert!(check("client_a", "profile").await.is_err());
        assert!(check("client_a", "").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_peer() {
        assert!(check("client_a", &format!("openid {}", cross("ghost"))).await.is_err());
        assert!(check("client_a", &format!("openid {CROSS_CLIENT_PREFIX}")).await.is_err());
    }

    #[test]
    fn test_parse_and_cross_client_ids() {
        let scopes = Scopes::parse(&format!("openid  {}\temail", cross("b")));
        assert_eq!(scopes.as_slice().len(), 3);
        assert!(scopes.has_openid());
        assert_eq!(scopes.cross_client_ids().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(scopes.to_string(), format!("openid {} email", cross("b")));
    }
}
