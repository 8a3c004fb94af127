//! Re-authentication hint derived from the `LastSeen` cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;

/// Cookie marking a browser that went through the authorization endpoint.
pub const LAST_SEEN_COOKIE: &str = "LastSeen";

/// Prompt passed to connectors when the browser was seen before.
pub const REPROMPT: &str = "select_account consent";

/// Returns `true` if the user agent carries the `LastSeen` marker.
#[must_use]
pub fn should_reprompt(jar: &CookieJar) -> bool {
    jar.get(LAST_SEEN_COOKIE).is_some()
}

/// The prompt hint for a connector.
#[must_use]
pub fn prompt_for(reprompt: bool) -> Option<&'static str> {
    reprompt.then_some(REPROMPT)
}

/// A fresh `LastSeen` cookie scoped to `path`.
#[must_use]
pub fn last_seen_cookie(path: &str, now: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((LAST_SEEN_COOKIE, now.unix_timestamp().to_string()))
        .path(path.to_string())
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(1))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_reprompt() {
        let jar = CookieJar::new();
        assert!(!should_reprompt(&jar));

        let jar = jar.add(Cookie::new("Other", "1"));
        assert!(!should_reprompt(&jar));

        let jar = jar.add(last_seen_cookie("/", OffsetDateTime::now_utc()));
        assert!(should_reprompt(&jar));
    }

    #[test]
    fn test_prompt_for() {
        assert_eq!(prompt_for(false), None);
        assert_eq!(prompt_for(true), Some(REPROMPT));
    }

    #[test]
    fn test_last_seen_cookie() {
        let cookie = last_seen_cookie("/dex", OffsetDateTime::from_unix_timestamp(42).unwrap());
        assert_eq!(cookie.name(), LAST_SEEN_COOKIE);
        assert_eq!(cookie.value(), "42");
        assert_eq!(cookie.path(), Some("/dex"));
        assert_eq!(cookie.http_only(), Some(true));
    }
}
