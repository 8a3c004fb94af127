//! Authorization request validation.
//!
//! Validation runs in a fixed order and stops at the first failure. Until a
//! redirect URL is confirmed for a known client, failures are answered with
//! a 400 error page; afterwards they are redirected back to the client,
//! except for a missing `openid` scope, which stays a 400.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use super::redirect::{error_redirect_url, resolve_redirect_url};
use crate::AuthError;
use crate::connector::ConnectorRegistry;
use crate::scope::{Scopes, validate_scopes};
use crate::storage::ClientStorage;

/// Raw query parameters of `GET /auth`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub connector_id: Option<String>,
    #[serde(default)]
    pub register: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

/// A request that passed every check.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub client_id: String,
    pub redirect_url: Url,
    pub state: Option<String>,
    pub scopes: Scopes,
    pub connector_id: String,
    /// Registration flow through the local connector.
    pub register: bool,
    pub nonce: Option<String>,
}

/// How a failed authorization request is answered.
#[derive(Debug)]
pub enum AuthorizeRejection {
    /// 400 with a JSON error body; the client or its redirect URL is not
    /// trusted.
    BadRequest(AuthError),
    /// 302 back to a confirmed redirect URL carrying `error` and `state`.
    Redirect { location: Url, error: AuthError },
}

impl AuthorizeRejection {
    /// Builds a redirect-back rejection.
    #[must_use]
    pub fn redirect(redirect_url: &Url, state: Option<&str>, error: AuthError) -> Self {
        let location = error_redirect_url(redirect_url, error.oauth_error_code(), state);
        Self::Redirect { location, error }
    }

    /// The underlying error.
    #[must_use]
    pub fn error(&self) -> &AuthError {
        match self {
            Self::BadRequest(error) | Self::Redirect { error, .. } => error,
        }
    }
}

/// Validates authorization requests against the client registry and the
/// connector registry.
pub struct AuthorizationValidator {
    clients: Arc<dyn ClientStorage>,
    connectors: Arc<ConnectorRegistry>,
}

impl AuthorizationValidator {
    pub fn new(clients: Arc<dyn ClientStorage>, connectors: Arc<ConnectorRegistry>) -> Self {
        Self {
            clients,
            connectors,
        }
    }

    /// Validates `request`.
    ///
    /// # Errors
    ///
    /// Returns the rejection to send, in this order:
    ///
    /// 1. missing or unknown `client_id` (400)
    /// 2. no resolvable redirect URL (400)
    /// 3. `response_type` other than `code` (redirect)
    /// 4. `openid` missing from `scope` (400)
    /// 5. other scope problems (redirect, `invalid_scope`)
    /// 6. unknown `connector_id` (400)
    pub async fn validate(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<ValidatedRequest, AuthorizeRejection> {
        let client_id = request
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AuthorizeRejection::BadRequest(AuthError::invalid_request("missing client_id"))
            })?;

        let client = self
            .clients
            .find_by_id(client_id)
            .await
            .map_err(AuthorizeRejection::BadRequest)?
            .ok_or_else(|| {
                AuthorizeRejection::BadRequest(AuthError::invalid_request(format!(
                    "unknown client {client_id}"
                )))
            })?;

        let redirect_url = resolve_redirect_url(&client, request.redirect_uri.as_deref())
            .map_err(AuthorizeRejection::BadRequest)?;
        let state = request.state.as_deref();

        let response_type = request.response_type.as_deref().unwrap_or_default();
        if response_type != "code" {
            return Err(AuthorizeRejection::redirect(
                &redirect_url,
                state,
                AuthError::unsupported_response_type(response_type),
            ));
        }

        let scopes = Scopes::parse(request.scope.as_deref().unwrap_or_default());
        if !scopes.has_openid() {
            return Err(AuthorizeRejection::BadRequest(AuthError::invalid_scope(
                "missing required scope openid",
            )));
        }
        validate_scopes(client_id, &scopes, self.clients.as_ref())
            .await
            .map_err(|e| AuthorizeRejection::redirect(&redirect_url, state, e))?;

        let connector_id = request.connector_id.as_deref().unwrap_or_default();
        if self.connectors.get(connector_id).is_none() {
            return Err(AuthorizeRejection::BadRequest(AuthError::invalid_request(
                format!("unknown connector_id {connector_id:?}"),
            )));
        }

        let register =
            request.register.as_deref() == Some("1") && self.connectors.is_local(connector_id);

        Ok(ValidatedRequest {
            client_id: client.id,
            redirect_url,
            state: request.state.clone(),
            scopes,
            connector_id: connector_id.to_string(),
            register,
            nonce: request.nonce.clone().filter(|n| !n.is_empty()),
        })
    }
}
