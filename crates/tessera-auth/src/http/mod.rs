//! HTTP endpoints.
//!
//! All routes live below the issuer's path. Each route accepts only its
//! own method; axum answers anything else with `405 Method Not Allowed`.
//!
//! | Route | Method | Handler |
//! |---|---|---|
//! | `/auth` | GET | [`auth::authorize_handler`] |
//! | `/token` | POST | [`token::token_handler`] |
//! | `/.well-known/openid-configuration` | GET | [`discovery::openid_configuration_handler`] |
//! | `/keys` | GET | [`keys::keys_handler`] |
//! | `/oob` | GET | [`oob::oob_handler`] |
//! | `/health` | GET | [`health::health_handler`] |
//! | `/auth/<connector_id>/…` | connector-defined | [`Connector::routes`](crate::connector::Connector::routes) |

pub mod auth;
pub mod basic_auth;
pub mod discovery;
pub mod error;
pub mod health;
pub mod keys;
pub mod oob;
pub mod token;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use url::Url;

use crate::connector::{ConnectorContext, ConnectorRegistry, LoginCallback};
use crate::oauth::redirect::endpoint_url;
use crate::oauth::{AuthorizationFlow, TokenExchange};
use crate::token::KeyManager;

/// Shared state of every identity provider endpoint.
#[derive(Clone)]
pub struct IdpState {
    pub flow: Arc<AuthorizationFlow>,
    pub exchange: Arc<TokenExchange>,
    pub keys: Arc<dyn KeyManager>,
    pub connectors: Arc<ConnectorRegistry>,
    pub issuer: Url,
}

/// Builds the identity provider router, nested under the issuer path.
pub fn router(state: IdpState) -> Router {
    let issuer = state.issuer.clone();
    let login: Arc<dyn LoginCallback> = state.flow.clone();
    let connectors = Arc::clone(&state.connectors);

    let mut routes = Router::new()
        .route("/auth", get(auth::authorize_handler))
        .route("/token", post(token::token_handler))
        .route(
            "/.well-known/openid-configuration",
            get(discovery::openid_configuration_handler),
        )
        .route("/keys", get(keys::keys_handler))
        .route("/oob", get(oob::oob_handler))
        .route("/health", get(health::health_handler))
        .with_state(state);

    for connector in connectors.iter() {
        let mount = format!("auth/{}", connector.id());
        let ctx = ConnectorContext {
            login: Arc::clone(&login),
            base_url: endpoint_url(&issuer, &mount),
        };
        if let Some(connector_routes) = connector.routes(ctx) {
            tracing::debug!(connector_id = %connector.id(), "mounting connector routes");
            routes = routes.nest(&format!("/{mount}"), connector_routes);
        }
    }

    let base = issuer.path().trim_end_matches('/');
    if base.is_empty() {
        routes
    } else {
        Router::new().nest(base, routes)
    }
}
