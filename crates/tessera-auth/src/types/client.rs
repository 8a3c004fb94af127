//! OAuth client registration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::secret;

/// Out-of-band redirect sentinel for clients that cannot receive redirects.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// A registered OAuth 2.0 client.
///
/// The core treats clients as read-only lookup data; they are created by
/// configuration or an admin surface outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier.
    pub id: String,

    /// Plaintext secret as configured. Replaced by `secret_hash` when the
    /// client is registered and never serialized.
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,

    /// Argon2id PHC string of the secret used for HTTP Basic
    /// authentication at the token endpoint.
    #[serde(default, alias = "secret_hash", skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,

    /// Public clients (native apps, CLIs) may only redirect to a loopback
    /// address or the out-of-band sentinel.
    #[serde(default)]
    pub public: bool,

    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Registered redirect URLs.
    #[serde(default, alias = "redirect_urls")]
    pub redirect_urls: Vec<Url>,

    /// Clients allowed to request cross-client tokens naming this client.
    #[serde(default, alias = "trusted_peers")]
    pub trusted_peers: Vec<String>,
}

impl Client {
    /// Creates a confidential client.
    #[must_use]
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: Some(secret.into()),
            secret_hash: None,
            public: false,
            name: None,
            redirect_urls: Vec::new(),
            trusted_peers: Vec::new(),
        }
    }

    /// Adds a registered redirect URL.
    #[must_use]
    pub fn with_redirect_url(mut self, url: Url) -> Self {
        self.redirect_urls.push(url);
        self
    }

    /// Adds a trusted peer.
    #[must_use]
    pub fn with_trusted_peer(mut self, peer: impl Into<String>) -> Self {
        self.trusted_peers.push(peer.into());
        self
    }

    /// Marks the client as public.
    #[must_use]
    pub fn into_public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty, a confidential client has no
    /// secret, or a public client registers a URL it could never use.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        let has_secret = [&self.secret, &self.secret_hash]
            .iter()
            .any(|s| s.as_deref().is_some_and(|s| !s.is_empty()));
        if !self.public && !has_secret {
            return Err(ClientValidationError::MissingSecret);
        }

        if self.public {
            if let Some(url) = self
                .redirect_urls
                .iter()
                .find(|url| !is_public_redirect_url(url))
            {
                return Err(ClientValidationError::PublicRedirectUrl(url.to_string()));
            }
        }

        Ok(())
    }

    /// Checks if the given redirect URL is registered for this client.
    #[must_use]
    pub fn is_redirect_url_registered(&self, url: &Url) -> bool {
        self.redirect_urls.iter().any(|registered| registered == url)
    }

    /// Returns `true` if `peer` may request tokens for this client.
    #[must_use]
    pub fn trusts(&self, peer: &str) -> bool {
        self.trusted_peers.iter().any(|p| p == peer)
    }

    /// Replaces the plaintext secret with its Argon2id hash.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn with_hashed_secret(mut self) -> Result<Self, argon2::password_hash::Error> {
        if let Some(plain) = self.secret.take().filter(|s| !s.is_empty()) {
            self.secret_hash = Some(secret::hash_secret(&plain)?);
        }
        Ok(self)
    }

    /// Checks a presented secret against the stored hash.
    ///
    /// Costs one Argon2 verification whether or not a hash is stored. A
    /// client that was never hashed (see [`Client::with_hashed_secret`])
    /// matches nothing.
    #[must_use]
    pub fn verify_secret(&self, presented: &str) -> bool {
        let Some(hash) = self.secret_hash.as_deref() else {
            return secret::verify_against_decoy(presented);
        };
        secret::verify_secret(presented, hash).unwrap_or_else(|e| {
            tracing::warn!(client_id = %self.id, error = %e, "stored client secret hash is malformed");
            false
        })
    }
}

/// Returns `true` for redirect URLs a public client may use: the
/// out-of-band sentinel, or plain `http` on a loopback host with an explicit
/// port and no path, query or fragment.
#[must_use]
pub fn is_public_redirect_url(url: &Url) -> bool {
    if url.as_str() == OOB_REDIRECT_URI {
        return true;
    }
    url.scheme() == "http"
        && matches!(url.host_str(), Some("localhost" | "127.0.0.1"))
        && url.port().is_some()
        && matches!(url.path(), "" | "/")
        && url.query().is_none()
        && url.fragment().is_none()
}

/// Client validation errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ClientValidationError {
    /// Client ID is empty.
    #[error("client ID cannot be empty")]
    EmptyClientId,

    /// Confidential client has no secret.
    #[error("confidential client requires a secret")]
    MissingSecret,

    /// Public client registered a URL outside the loopback/OOB set.
    #[error("public client cannot register redirect URL {0}")]
    PublicRedirectUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_verify_secret() {
        let client = Client::new("app", "s3cret").with_hashed_secret().unwrap();
        assert_eq!(client.secret, None);
        assert!(client.secret_hash.as_deref().unwrap().starts_with("$argon2id$"));
        assert!(client.verify_secret("s3cret"));
        assert!(!client.verify_secret("s3cret "));
        assert!(!client.verify_secret(""));

        let mut public = Client::new("cli", "x").into_public();
        public.secret = None;
        let public = public.with_hashed_secret().unwrap();
        assert!(public.secret_hash.is_none());
        assert!(!public.verify_secret(""));
    }

    #[test]
    fn test_unhashed_secret_matches_nothing() {
        let client = Client::new("app", "s3cret");
        assert!(!client.verify_secret("s3cret"));
    }

    #[test]
    fn test_plaintext_secret_not_serialized() {
        let client = Client::new("app", "s3cret");
        let json = serde_json::to_value(&client).unwrap();
        assert!(json.get("secret").is_none());

        let json = serde_json::to_value(client.with_hashed_secret().unwrap()).unwrap();
        assert!(json.get("secret").is_none());
        assert!(json["secretHash"].as_str().unwrap().starts_with("$argon2id$"));
    }

    #[test]
    fn test_prehashed_secret_is_valid() {
        let mut client = Client::new("app", "");
        client.secret_hash = Some(secret::hash_secret("s3cret").unwrap());
        assert!(client.validate().is_ok());
        assert!(client.verify_secret("s3cret"));
    }

    #[test]
    fn test_validate() {
        assert!(Client::new("app", "s").validate().is_ok());

        let mut no_secret = Client::new("app", "");
        assert_eq!(no_secret.validate(), Err(ClientValidationError::MissingSecret));
        no_secret.id = String::new();
        assert_eq!(no_secret.validate(), Err(ClientValidationError::EmptyClientId));

        let public = Client::new("cli", "")
            .into_public()
            .with_redirect_url(url("https://example.com/cb"));
        assert!(matches!(
            public.validate(),
            Err(ClientValidationError::PublicRedirectUrl(_))
        ));
    }

    #[test]
    fn test_public_redirect_urls() {
        assert!(is_public_redirect_url(&url(OOB_REDIRECT_URI)));
        assert!(is_public_redirect_url(&url("http://localhost:8080")));
        assert!(is_public_redirect_url(&url("http://127.0.0.1:5555/")));

        assert!(!is_public_redirect_url(&url("http://localhost")));
        assert!(!is_public_redirect_url(&url("https://localhost:8080")));
        assert!(!is_public_redirect_url(&url("http://localhost:8080/callback")));
        assert!(!is_public_redirect_url(&url("http://localhost:8080?x=1")));
        assert!(!is_public_redirect_url(&url("http://localhost:8080#frag")));
        assert!(!is_public_redirect_url(&url("http://example.com:8080")));
    }

    #[test]
    fn test_trusts() {
        let client = Client::new("b", "s").with_trusted_peer("a");
        assert!(client.trusts("a"));
        assert!(!client.trusts("c"));
    }
}
