//! OpenID Provider discovery: `GET /.well-known/openid-configuration`.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use serde::Serialize;
use url::Url;

use super::IdpState;
use crate::oauth::redirect::endpoint_url;

/// Provider metadata, serialized in this field order.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub response_types_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
    pub subject_types_supported: Vec<&'static str>,
    pub id_token_signing_alg_values_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
}

impl ProviderMetadata {
    /// Metadata for `issuer`.
    #[must_use]
    pub fn for_issuer(issuer: &Url, refresh_tokens: bool, client_credentials: bool) -> Self {
        let mut grant_types = vec!["authorization_code"];
        if refresh_tokens {
            grant_types.push("refresh_token");
        }
        if client_credentials {
            grant_types.push("client_credentials");
        }

        Self {
            issuer: issuer.as_str().trim_end_matches('/').to_string(),
            authorization_endpoint: endpoint_url(issuer, "auth").to_string(),
            token_endpoint: endpoint_url(issuer, "token").to_string(),
            jwks_uri: endpoint_url(issuer, "keys").to_string(),
            response_types_supported: vec!["code"],
            grant_types_supported: grant_types,
            subject_types_supported: vec!["public"],
            id_token_signing_alg_values_supported: vec!["RS256"],
            token_endpoint_auth_methods_supported: vec!["client_secret_basic"],
        }
    }
}

pub async fn openid_configuration_handler(State(state): State<IdpState>) -> impl IntoResponse {
    let config = state.exchange.config();
    let metadata = ProviderMetadata::for_issuer(
        &state.issuer,
        config.enable_refresh_tokens,
        config.enable_client_credentials,
    );
    (
        [(header::CACHE_CONTROL, "public, max-age=86400")],
        Json(metadata),
    )
}
