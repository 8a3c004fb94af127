//! Public signing keys: `GET /keys`.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use time::OffsetDateTime;
use time::macros::format_description;

use super::IdpState;

/// Publishes the verification keys. Caches are told to keep them until the
/// current key set expires.
pub async fn keys_handler(State(state): State<IdpState>) -> Response {
    let set = state.keys.key_set();
    let now = OffsetDateTime::now_utc();
    let max_age = (set.expires_at - now).whole_seconds().max(0);

    let mut headers = vec![(header::CACHE_CONTROL, format!("public, max-age={max_age}"))];
    match http_date(set.expires_at) {
        Some(expires) => headers.push((header::EXPIRES, expires)),
        None => tracing::warn!(expires_at = %set.expires_at, "could not format Expires header"),
    }

    let mut response = Json(set.jwks()).into_response();
    for (name, value) in headers {
        if let Ok(value) = value.parse() {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

/// RFC 7231 IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub(crate) fn http_date(at: OffsetDateTime) -> Option<String> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.to_offset(time::UtcOffset::UTC).format(&format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_http_date() {
        assert_eq!(
            http_date(datetime!(1994-11-06 08:49:37 UTC)).unwrap(),
            "Sun, 06 Nov 1994 08:49:37 GMT"
        );
        assert_eq!(
            http_date(datetime!(2026-01-02 01:00:00 +01:00)).unwrap(),
            "Fri, 02 Jan 2026 00:00:00 GMT"
        );
    }
}
