//! Out-of-band code display: `GET /oob?code=...`.

use axum::extract::Query;
use axum::response::Html;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OobQuery {
    #[serde(default)]
    pub code: String,
}

/// Shows the authorization code for the user to copy into a client that
/// registered `urn:ietf:wg:oauth:2.0:oob`.
pub async fn oob_handler(Query(query): Query<OobQuery>) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Login Successful</title></head>\n<body>\n\
         <h1>Login Successful</h1>\n\
         <p>Please copy this code, switch to your application and paste it there:</p>\n\
         <input type=\"text\" readonly value=\"{}\">\n</body>\n</html>\n",
        escape_html(&query.code)
    ))
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
