//! Redirect URL resolution and construction.

use url::Url;

use crate::types::{Client, is_public_redirect_url};
use crate::{AuthError, AuthResult};

/// Picks the redirect URL for an authorization request.
///
/// A requested URL must be registered for the client, and for public
/// clients must also be a loopback or out-of-band URL. Without a requested
/// URL, the client's only registered URL is used; zero or several
/// registered URLs are ambiguous.
///
/// # Errors
///
/// Returns `AuthError::InvalidRequest` whenever no URL can be trusted. The
/// caller must answer with an error page, never a redirect.
pub fn resolve_redirect_url(client: &Client, requested: Option<&str>) -> AuthResult<Url> {
    let url = match requested.filter(|s| !s.is_empty()) {
        Some(raw) => {
            let url = Url::parse(raw)
                .map_err(|e| AuthError::invalid_request(format!("invalid redirect_uri: {e}")))?;
            if !client.is_redirect_url_registered(&url) {
                return Err(AuthError::invalid_request(format!(
                    "redirect_uri {url} is not registered for client {}",
                    client.id
                )));
            }
            url
        }
        None => match client.redirect_urls.as_slice() {
            [only] => only.clone(),
            [] => {
                return Err(AuthError::invalid_request(format!(
                    "client {} has no registered redirect URLs",
                    client.id
                )));
            }
            _ => {
                return Err(AuthError::invalid_request(
                    "redirect_uri is required when several URLs are registered",
                ));
            }
        },
    };

    if client.public && !is_public_redirect_url(&url) {
        return Err(AuthError::invalid_request(format!(
            "public client {} may only redirect to loopback or out-of-band URLs",
            client.id
        )));
    }

    Ok(url)
}

/// `redirect_url` with `code` and `state` appended.
#[must_use]
pub fn code_redirect_url(redirect_url: &Url, code: &str, state: Option<&str>) -> Url {
    let mut url = redirect_url.clone();
    url.query_pairs_mut()
        .append_pair("code", code)
        .append_pair("state", state.unwrap_or_default());
    url
}

/// `redirect_url` with `error` and `state` appended. `state` is always
/// present, empty when the client sent none.
#[must_use]
pub fn error_redirect_url(redirect_url: &Url, error: &str, state: Option<&str>) -> Url {
    let mut url = redirect_url.clone();
    url.query_pairs_mut()
        .append_pair("error", error)
        .append_pair("state", state.unwrap_or_default());
    url
}

/// Absolute path of an endpoint below the issuer's path, e.g. `/register`
/// for `https://id.example.com` or `/dex/register` for
/// `https://id.example.com/dex/`.
#[must_use]
pub fn endpoint_path(issuer: &Url, endpoint: &str) -> String {
    format!("{}/{endpoint}", issuer.path().trim_end_matches('/'))
}

/// Absolute URL of an endpoint below the issuer.
#[must_use]
pub fn endpoint_url(issuer: &Url, endpoint: &str) -> Url {
    let mut url = issuer.clone();
    url.set_path(&endpoint_path(issuer, endpoint));
    url.set_query(None);
    url.set_fragment(None);
    url
}
