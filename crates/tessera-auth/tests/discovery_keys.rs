//! Discovery, JWKS and health endpoints.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use tessera_auth::RotatingKeyManager;
use tessera_auth::token::SigningKeyPair;

#[tokio::test]
async fn test_discovery_document() {
    let h = default_harness().await;
    let response = h.get("/.well-known/openid-configuration").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=86400"
    );
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

    let body = body_json(response).await;
    assert_eq!(body["issuer"], "http://server.example.com");
    assert_eq!(body["authorization_endpoint"], "http://server.example.com/auth");
    assert_eq!(body["token_endpoint"], "http://server.example.com/token");
    assert_eq!(body["jwks_uri"], "http://server.example.com/keys");
    assert_eq!(body["response_types_supported"], serde_json::json!(["code"]));
    assert_eq!(
        body["grant_types_supported"],
        serde_json::json!(["authorization_code", "refresh_token", "client_credentials"])
    );
    assert_eq!(body["subject_types_supported"], serde_json::json!(["public"]));
    assert_eq!(
        body["id_token_signing_alg_values_supported"],
        serde_json::json!(["RS256"])
    );
}

#[tokio::test]
async fn test_discovery_below_issuer_path() {
    let h = harness("http://server.example.com/foobar").build().await;
    let response = h.get("/foobar/.well-known/openid-configuration").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["issuer"], "http://server.example.com/foobar");
    assert_eq!(body["token_endpoint"], "http://server.example.com/foobar/token");
}

#[tokio::test]
async fn test_keys_document() {
    let h = default_harness().await;
    let response = h.get("/keys").await;

    assert_eq!(response.status(), StatusCode::OK);
    let cache_control = response.headers()[header::CACHE_CONTROL]
        .to_str()
        .unwrap()
        .to_string();
    let max_age: i64 = cache_control
        .strip_prefix("public, max-age=")
        .unwrap()
        .parse()
        .unwrap();
    assert!((3500..=3600).contains(&max_age), "{cache_control}");
    let expires = response.headers()[header::EXPIRES].to_str().unwrap();
    assert!(expires.ends_with(" GMT"), "{expires}");

    let body = body_json(response).await;
    let keys = body["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["kid"], signing_key().kid.as_str());
    assert_eq!(keys[0]["kty"], "RSA");
    assert_eq!(keys[0]["alg"], "RS256");
    assert_eq!(keys[0]["use"], "sig");
}

#[tokio::test]
async fn test_rotation_keeps_previous_key_published() {
    let manager = Arc::new(RotatingKeyManager::with_key(
        SigningKeyPair::generate_rsa().unwrap(),
        Duration::from_secs(3600),
        Duration::from_secs(60),
    ));
    let h = harness("http://server.example.com")
        .keys(manager.clone())
        .build()
        .await;

    let response = h
        .token(
            "/token",
            Some((CLIENT_ID, CLIENT_SECRET)),
            "grant_type=client_credentials",
        )
        .await;
    let old_token = body_json(response).await["id_token"]
        .as_str()
        .unwrap()
        .to_string();

    manager.rotate().unwrap();

    let body = body_json(h.get("/keys").await).await;
    assert_eq!(body["keys"].as_array().unwrap().len(), 2);
    // tokens signed before the rotation still verify
    assert!(h.keys.verify(&old_token, &h.issuer).is_ok());
}

#[tokio::test]
async fn test_discovery_and_keys_only_accept_get() {
    let h = default_harness().await;
    for uri in ["/.well-known/openid-configuration", "/keys"] {
        for method in ["POST", "PUT", "DELETE"] {
            let response = h
                .send(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await;
            assert_eq!(
                response.status(),
                StatusCode::METHOD_NOT_ALLOWED,
                "{method} {uri}"
            );
        }
    }
}

#[tokio::test]
async fn test_health() {
    let h = default_harness().await;
    let response = h.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connectors"]["fake"], "ok");

    let h = harness("http://server.example.com")
        .connector(FakeConnector::new("local"))
        .connector(FakeConnector::new("ldap").unhealthy("connection refused"))
        .build()
        .await;
    let response = h.get("/health").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["connectors"]["local"], "ok");
    assert!(
        body["connectors"]["ldap"]
            .as_str()
            .unwrap()
            .contains("connection refused")
    );
}
