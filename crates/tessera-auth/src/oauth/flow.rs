//! Authorization flow controller.
//!
//! ```text
//! GET /auth ─► validate ─► session (New) ─► connector login URL
//!                                                │
//!         connector handler ─► LoginCallback::login(identity, key)
//!                                                │
//!                          session (Identified) ─┤─► /register?code=…  (no local user yet)
//!                                                │
//!                       session (Authenticated) ─┴─► redirect_uri?code=…&state=…
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;
use url::form_urlencoded;

use super::authorize::{AuthorizationRequest, AuthorizationValidator, AuthorizeRejection};
use super::prompt::prompt_for;
use super::redirect::{code_redirect_url, endpoint_path, endpoint_url, error_redirect_url};
use crate::connector::{Connector, ConnectorRegistry, LoginCallback};
use crate::session::{Identity, NewSession, Session, SessionManager};
use crate::storage::{ClientStorage, UserStorage};
use crate::types::{OOB_REDIRECT_URI, RemoteIdentity, User};
use crate::{AuthError, AuthResult};

pub struct AuthorizationFlow {
    validator: AuthorizationValidator,
    sessions: Arc<SessionManager>,
    connectors: Arc<ConnectorRegistry>,
    users: Arc<dyn UserStorage>,
    issuer: Url,
}

impl AuthorizationFlow {
    pub fn new(
        clients: Arc<dyn ClientStorage>,
        users: Arc<dyn UserStorage>,
        sessions: Arc<SessionManager>,
        connectors: Arc<ConnectorRegistry>,
        issuer: Url,
    ) -> Self {
        Self {
            validator: AuthorizationValidator::new(clients, Arc::clone(&connectors)),
            sessions,
            connectors,
            users,
            issuer,
        }
    }

    #[must_use]
    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    /// Handles an authorization request and returns where to redirect.
    ///
    /// `reprompt` comes from the `LastSeen` cookie.
    ///
    /// # Errors
    ///
    /// See [`AuthorizationValidator::validate`]. Failures after validation
    /// are redirected back to the client with `server_error`.
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        reprompt: bool,
    ) -> Result<String, AuthorizeRejection> {
        let validated = self.validator.validate(request).await?;
        let state = validated.state.as_deref();
        let redirect_back = |e: AuthError| {
            tracing::warn!(
                client_id = %validated.client_id,
                connector_id = %validated.connector_id,
                error = %e,
                "authorization failed after validation"
            );
            AuthorizeRejection::redirect(&validated.redirect_url, state, e)
        };

        let session_id = self
            .sessions
            .new_session(NewSession {
                connector_id: validated.connector_id.clone(),
                client_id: validated.client_id.clone(),
                client_state: validated.state.clone(),
                redirect_url: validated.redirect_url.clone(),
                scope: validated.scopes.as_slice().to_vec(),
                nonce: validated.nonce.clone(),
                register: validated.register,
            })
            .await
            .map_err(redirect_back)?;
        let key = self
            .sessions
            .new_session_key(&session_id)
            .await
            .map_err(redirect_back)?;

        if validated.register {
            tracing::info!(client_id = %validated.client_id, "registration flow started");
            return Ok(with_code(&endpoint_path(&self.issuer, "register"), &key));
        }

        let connector = self
            .connectors
            .get(&validated.connector_id)
            .ok_or_else(|| redirect_back(AuthError::internal("connector vanished")))?;
        let prompt = prompt_for(reprompt);
        let login_url = connector
            .login_url(&key, prompt)
            .await
            .map_err(redirect_back)?;

        tracing::debug!(
            client_id = %validated.client_id,
            connector_id = %validated.connector_id,
            prompt = ?prompt,
            "redirecting to connector"
        );
        Ok(login_url.to_string())
    }

    /// Completes a registration: creates `user`, links the session's
    /// remote identity to it and finishes the flow.
    ///
    /// `code` is the key handed out with the registration redirect.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` for an unknown code and
    /// `AuthError::InvalidState` if the session has no remote identity.
    pub async fn register(&self, code: &str, user: User) -> AuthResult<String> {
        let session_id = self.sessions.exchange_key(code).await?;
        let session = self.sessions.get(&session_id).await?;
        let identity = session
            .identity
            .clone()
            .ok_or_else(|| AuthError::invalid_state("session has no remote identity"))?;
        let connector = self.connector_for(&session)?;

        self.users.create(&user).await?;
        self.users
            .add_remote_identity(
                &user.id,
                &RemoteIdentity::new(&session.connector_id, &identity.id),
            )
            .await?;
        tracing::info!(user_id = %user.id, connector_id = %session.connector_id, "user registered");

        self.finish_or_redirect(&session, connector.as_ref(), &identity, &user)
            .await
    }

    fn connector_for(&self, session: &Session) -> AuthResult<Arc<dyn Connector>> {
        self.connectors.get(&session.connector_id).ok_or_else(|| {
            AuthError::connector(&session.connector_id, "connector is not registered")
        })
    }

    async fn resolve_user(
        &self,
        connector: &dyn Connector,
        identity: &Identity,
        remote: &RemoteIdentity,
    ) -> AuthResult<Option<User>> {
        if let Some(user) = self.users.find_by_remote_identity(remote).await? {
            return Ok(Some(user));
        }

        let Some(email) = identity.email.as_deref().filter(|e| !e.is_empty()) else {
            return Ok(None);
        };
        if !connector.trusted_email_provider() {
            return Ok(None);
        }

        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(None);
        };
        self.users.add_remote_identity(&user.id, remote).await?;
        tracing::info!(
            user_id = %user.id,
            connector_id = %remote.connector_id,
            "remote identity linked by trusted email"
        );
        Ok(Some(user))
    }

    /// Binds `user`, collects groups and issues the authorization code.
    /// Failures are turned into an error redirect to the client.
    async fn finish_or_redirect(
        &self,
        session: &Session,
        connector: &dyn Connector,
        identity: &Identity,
        user: &User,
    ) -> AuthResult<String> {
        match self.finish(session, connector, identity, user).await {
            Ok(location) => Ok(location),
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "login could not be completed");
                if let Err(kill_err) = self.sessions.kill(&session.id).await {
                    tracing::warn!(session_id = %session.id, error = %kill_err, "failed to kill session");
                }
                Ok(error_redirect_url(
                    &session.redirect_url,
                    e.oauth_error_code(),
                    session.client_state.as_deref(),
                )
                .to_string())
            }
        }
    }

    async fn finish(
        &self,
        session: &Session,
        connector: &dyn Connector,
        identity: &Identity,
        user: &User,
    ) -> AuthResult<String> {
        if user.disabled {
            return Err(AuthError::access_denied(format!("user {} is disabled", user.id)));
        }

        self.sessions.attach_user(&session.id, &user.id).await?;

        if let Some(groups) = connector.groups() {
            let groups = groups.groups(&identity.id).await?;
            self.sessions.add_groups(&session.id, groups).await?;
        }

        let code = self.sessions.new_session_key(&session.id).await?;
        tracing::info!(
            session_id = %session.id,
            client_id = %session.client_id,
            user_id = %user.id,
            "authorization code issued"
        );

        if session.redirect_url.as_str() == OOB_REDIRECT_URI {
            return Ok(with_code(endpoint_url(&self.issuer, "oob").as_str(), &code));
        }
        Ok(code_redirect_url(&session.redirect_url, &code, session.client_state.as_deref()).to_string())
    }
}

#[async_trait]
impl LoginCallback for AuthorizationFlow {
    async fn login(&self, identity: Identity, session_key: &str) -> AuthResult<String> {
        let session_id = self.sessions.exchange_key(session_key).await?;
        let session = self
            .sessions
            .attach_remote_identity(&session_id, identity.clone())
            .await?;
        tracing::debug!(session_id = %session.id, connector_id = %session.connector_id, "remote identity attached");

        if session.register {
            let code = self.sessions.new_session_key(&session.id).await?;
            return Ok(with_code(endpoint_url(&self.issuer, "register").as_str(), &code));
        }

        let connector = self.connector_for(&session)?;
        let remote = RemoteIdentity::new(&session.connector_id, &identity.id);
        let Some(user) = self.resolve_user(connector.as_ref(), &identity, &remote).await? else {
            tracing::info!(session_id = %session.id, "no local user for remote identity, sending to registration");
            let code = self.sessions.new_session_key(&session.id).await?;
            return Ok(with_code(endpoint_url(&self.issuer, "register").as_str(), &code));
        };

        self.finish_or_redirect(&session, connector.as_ref(), &identity, &user)
            .await
    }
}

fn with_code(base: &str, code: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .finish();
    format!("{base}?{query}")
}
