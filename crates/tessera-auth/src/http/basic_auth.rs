//! HTTP Basic client credentials.

use axum::http::{HeaderMap, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Extracts `(client_id, client_secret)` from an `Authorization: Basic`
/// header.
///
/// Both halves are form-urlencoded before base64 encoding (RFC 6749
/// section 2.3.1), so a `:` inside a client ID arrives as `%3A`.
///
/// # Errors
///
/// Returns a description of what is wrong when the header is missing, not
/// Basic, not valid base64/UTF-8, has no `:` separator, or a half does not
/// decode.
pub fn parse_basic_auth(headers: &HeaderMap) -> Result<(String, String), String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "missing Authorization header".to_string())?
        .to_str()
        .map_err(|_| "Authorization header is not ASCII".to_string())?;

    let encoded = value
        .strip_prefix("Basic ")
        .ok_or_else(|| "Authorization is not Basic".to_string())?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;
    let decoded = String::from_utf8(decoded).map_err(|_| "credentials are not UTF-8".to_string())?;

    let (client_id, secret) = decoded
        .split_once(':')
        .ok_or_else(|| "credentials have no ':' separator".to_string())?;
    let client_id = form_decode(client_id)?;
    if client_id.is_empty() {
        return Err("empty client ID".to_string());
    }
    Ok((client_id, form_decode(secret)?))
}

fn form_decode(value: &str) -> Result<String, String> {
    urlencoding::decode(&value.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|_| "credentials are not UTF-8 once decoded".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_valid() {
        let encoded = STANDARD.encode("app:s3cr:et");
        let (id, secret) = parse_basic_auth(&headers(&format!("Basic {encoded}"))).unwrap();
        assert_eq!(id, "app");
        assert_eq!(secret, "s3cr:et");
    }

    #[test]
    fn test_form_encoded_halves() {
        let encoded = STANDARD.encode("my%3Aapp:p%25ss+word%2B");
        let (id, secret) = parse_basic_auth(&headers(&format!("Basic {encoded}"))).unwrap();
        assert_eq!(id, "my:app");
        assert_eq!(secret, "p%ss word+");

        let bad_utf8 = STANDARD.encode("app:%FF");
        assert!(parse_basic_auth(&headers(&format!("Basic {bad_utf8}"))).is_err());
    }

    #[test]
    fn test_invalid() {
        assert!(parse_basic_auth(&HeaderMap::new()).is_err());
        assert!(parse_basic_auth(&headers("Bearer abc")).is_err());
        assert!(parse_basic_auth(&headers("Basic !!!")).is_err());
        let no_colon = STANDARD.encode("app");
        assert!(parse_basic_auth(&headers(&format!("Basic {no_colon}"))).is_err());
        let empty_id = STANDARD.encode(":secret");
        assert!(parse_basic_auth(&headers(&format!("Basic {empty_id}"))).is_err());
    }
}
