//! Token endpoint: `POST /token`.
//!
//! ```text
//! POST /token
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <base64(client_id:client_secret)>
//!
//! grant_type=authorization_code&code=...&state=...
//! ```

use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};

use super::IdpState;
use super::basic_auth::parse_basic_auth;
use super::error::status_for;
use crate::AuthError;
use crate::oauth::{GrantType, TokenErrorBody, TokenRequest};

/// Exchanges a grant for an ID token.
///
/// Checks run in order: form body, grant type, grant parameter, client
/// authentication, then the grant itself. Error bodies echo `state`, except
/// when the body itself could not be read.
pub async fn token_handler(
    State(state): State<IdpState>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            let err = AuthError::invalid_request(rejection.body_text());
            return error_response(&err, None);
        }
    };
    let echo = request.state.clone();
    match handle(&state, &headers, &request).await {
        Ok(response) => (
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::PRAGMA, "no-cache"),
            ],
            Json(response),
        )
            .into_response(),
        Err(err) => error_response(&err, echo),
    }
}

async fn handle(
    state: &IdpState,
    headers: &HeaderMap,
    request: &TokenRequest,
) -> Result<crate::oauth::TokenResponse, AuthError> {
    let raw_grant = request.grant_type.as_deref().unwrap_or_default();
    let grant = GrantType::parse(raw_grant)
        .ok_or_else(|| AuthError::unsupported_grant_type(raw_grant))?;

    let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
    let code = non_empty(&request.code);
    let refresh_token = non_empty(&request.refresh_token);
    match grant {
        GrantType::AuthorizationCode if code.is_none() => {
            return Err(AuthError::invalid_request("missing code"));
        }
        GrantType::RefreshToken if refresh_token.is_none() => {
            return Err(AuthError::invalid_request("missing refresh_token"));
        }
        _ => {}
    }

    let (client_id, secret) = parse_basic_auth(headers).map_err(|reason| {
        tracing::debug!(reason = %reason, "bad client credentials header");
        AuthError::invalid_client("client authentication required")
    })?;
    let client = state.exchange.authenticate(&client_id, &secret).await?;

    tracing::debug!(client_id = %client.id, grant_type = %grant, "token request");
    match grant {
        GrantType::AuthorizationCode => {
            state
                .exchange
                .exchange_code(&client, code.as_deref().unwrap_or_default())
                .await
        }
        GrantType::RefreshToken => {
            state
                .exchange
                .refresh(
                    &client,
                    refresh_token.as_deref().unwrap_or_default(),
                    request.scope.as_deref(),
                )
                .await
        }
        GrantType::ClientCredentials => {
            state
                .exchange
                .client_credentials(&client, request.scope.as_deref())
                .await
        }
    }
}

fn error_response(err: &AuthError, state: Option<String>) -> Response {
    let status = status_for(err);
    if err.is_server_error() {
        tracing::error!(error = %err, "token request failed");
    } else {
        tracing::info!(error = %err, status = status.as_u16(), "token request rejected");
    }
    let body = TokenErrorBody::new(err.oauth_error_code(), state);
    (status, Json(body)).into_response()
}
