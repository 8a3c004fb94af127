//! Authorization endpoint: `GET /auth`.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use time::OffsetDateTime;

use super::IdpState;
use super::error::json_error;
use crate::AuthError;
use crate::oauth::prompt::{last_seen_cookie, should_reprompt};
use crate::oauth::{AuthorizationRequest, AuthorizeRejection};

/// Starts an authorization.
///
/// On success the user agent is sent (302) to the connector's login page,
/// or to the registration page for `register=1`, and the `LastSeen` cookie
/// is refreshed. Rejections are either a JSON 400 or a 302 back to the
/// client carrying `error` and `state`. A query string that cannot be
/// parsed, for example one repeating a parameter, is a JSON 400.
pub async fn authorize_handler(
    State(state): State<IdpState>,
    jar: CookieJar,
    query: Result<Query<AuthorizationRequest>, QueryRejection>,
) -> Response {
    let request = match query {
        Ok(Query(request)) => request,
        Err(rejection) => {
            let err = AuthError::invalid_request(rejection.body_text());
            tracing::info!(error = %err, "malformed authorization request");
            return json_error(&err);
        }
    };
    let reprompt = should_reprompt(&jar);

    match state.flow.authorize(&request, reprompt).await {
        Ok(location) => {
            let cookie_path = match state.issuer.path() {
                "" => "/".to_string(),
                path => path.to_string(),
            };
            let jar = jar.add(last_seen_cookie(&cookie_path, OffsetDateTime::now_utc()));
            (jar, found(&location)).into_response()
        }
        Err(AuthorizeRejection::BadRequest(err)) => {
            tracing::info!(
                client_id = request.client_id.as_deref().unwrap_or_default(),
                error = %err,
                "authorization request rejected"
            );
            json_error(&err)
        }
        Err(AuthorizeRejection::Redirect { location, error }) => {
            tracing::info!(
                client_id = request.client_id.as_deref().unwrap_or_default(),
                error = %error,
                "authorization request redirected back with error"
            );
            found(location.as_str()).into_response()
        }
    }
}

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
