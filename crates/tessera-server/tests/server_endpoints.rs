use serde_json::Value;
use tessera_auth::Client;
use tessera_server::{AppConfig, ServerBuilder};
use tokio::task::JoinHandle;
use url::Url;

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    // Bind first so the issuer can name the real port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");

    let mut cfg = AppConfig::default();
    cfg.auth.issuer = base.clone();
    cfg.clients.push(
        Client::new("app", "s3cret")
            .with_redirect_url(Url::parse("https://app.example.com/callback").unwrap()),
    );
    let server = ServerBuilder::new()
        .with_config(cfg)
        .build()
        .await
        .expect("build server");

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let _ = server
            .serve(listener, async move {
                let _ = rx.await;
            })
            .await;
    });

    (base, tx, handle)
}

#[tokio::test]
async fn server_endpoints_work() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // discovery
    let resp = client
        .get(format!("{base}/.well-known/openid-configuration"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()["cache-control"].to_str().unwrap(),
        "public, max-age=86400"
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["issuer"], base.as_str());
    assert_eq!(body["token_endpoint"], format!("{base}/token"));

    // keys
    let resp = client.get(format!("{base}/keys")).send().await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("expires"));
    let jwks: Value = resp.json().await.unwrap();
    assert_eq!(jwks["keys"].as_array().unwrap().len(), 1);

    // health with no connectors
    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // client credentials against the seeded client
    let resp = client
        .post(format!("{base}/token"))
        .basic_auth("app", Some("s3cret"))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["cache-control"].to_str().unwrap(), "no-store");
    let token: Value = resp.json().await.unwrap();
    assert_eq!(token["token_type"], "bearer");
    assert!(token["id_token"].as_str().unwrap().split('.').count() == 3);

    // wrong secret
    let resp = client
        .post(format!("{base}/token"))
        .basic_auth("app", Some("nope"))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // method gating
    let resp = client.post(format!("{base}/keys")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 405);
    let resp = client.get(format!("{base}/token")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 405);

    // no connectors: the authorization request cannot be routed
    let resp = client
        .get(format!(
            "{base}/auth?response_type=code&client_id=app&scope=openid&connector_id=local"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn invalid_client_config_fails_build() {
    let mut cfg = AppConfig::default();
    cfg.clients.push(Client::new("", "secret"));
    assert!(ServerBuilder::new().with_config(cfg).build().await.is_err());
}
