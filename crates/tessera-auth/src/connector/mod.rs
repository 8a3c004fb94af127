//! Authentication backends.
//!
//! A [`Connector`] authenticates the end user somewhere (a local password
//! form, an upstream OIDC provider) and reports the result back through the
//! [`LoginCallback`] it receives in its [`ConnectorContext`].
//!
//! Connectors that can also report group membership expose it through
//! [`Connector::groups`]; the default answers "not supported".

mod registry;

pub use registry::ConnectorRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use url::Url;

use crate::AuthResult;
use crate::session::Identity;

/// Bridge from a connector back into the authorization flow.
#[async_trait]
pub trait LoginCallback: Send + Sync {
    /// Binds `identity` to the session behind `session_key` and returns the
    /// location the user agent should be sent to next.
    async fn login(&self, identity: Identity, session_key: &str) -> AuthResult<String>;
}

/// What a connector gets when it mounts its own routes.
#[derive(Clone)]
pub struct ConnectorContext {
    /// Called once the connector has verified an identity.
    pub login: Arc<dyn LoginCallback>,
    /// Public URL the connector's routes are mounted under.
    pub base_url: Url,
}

/// An authentication backend.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Registry key; also the `connector_id` request parameter.
    fn id(&self) -> &str;

    /// Returns where to send the user agent to authenticate.
    ///
    /// `session_key` must come back in [`LoginCallback::login`]. `prompt` is
    /// an OAuth2 prompt hint such as `"select_account consent"`.
    async fn login_url(&self, session_key: &str, prompt: Option<&str>) -> AuthResult<Url>;

    /// Routes mounted under `/auth/<id>`, e.g. an upstream callback.
    fn routes(&self, _ctx: ConnectorContext) -> Option<Router> {
        None
    }

    /// Refreshes cached upstream state.
    async fn sync(&self) -> AuthResult<()> {
        Ok(())
    }

    /// Whether emails this connector reports are verified, so an unknown
    /// remote identity may be linked to the local user with that email.
    fn trusted_email_provider(&self) -> bool {
        false
    }

    /// Reports whether the upstream is reachable.
    async fn healthy(&self) -> AuthResult<()> {
        Ok(())
    }

    /// Group lookup, if this connector supports it.
    fn groups(&self) -> Option<&dyn GroupsConnector> {
        None
    }
}

/// Optional group-membership capability.
#[async_trait]
pub trait GroupsConnector: Send + Sync {
    /// Groups of the remote user `remote_user_id`.
    async fn groups(&self, remote_user_id: &str) -> AuthResult<Vec<String>>;
}
