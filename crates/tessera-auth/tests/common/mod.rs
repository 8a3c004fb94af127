//! Shared fixtures: an in-memory identity provider with a fake upstream
//! connector and predictable session keys.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::Query;
use axum::http::{Request, Response, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http_body_util::BodyExt;
use serde::Deserialize;
use tower::ServiceExt;
use url::Url;

use tessera_auth::connector::GroupsConnector;
use tessera_auth::session::SequentialKeyGenerator;
use tessera_auth::token::SigningKeyPair;
use tessera_auth::{
    AuthConfig, AuthResult, AuthorizationFlow, Client, Connector, ConnectorContext,
    ConnectorRegistry, Identity, IdpState, KeyManager, KeySet, RemoteIdentity, SessionManager,
    TokenExchange, User, UserStorage, router,
};
use tessera_db_memory::MemoryStores;

pub const CLIENT_ID: &str = "XXX";
pub const CLIENT_SECRET: &str = "secrete";
pub const CLIENT_REDIRECT: &str = "http://client.example.com/callback";
pub const PEER_ID: &str = "peer";
pub const CLI_ID: &str = "cli";
pub const CLI_SECRET: &str = "cli-secret";

/// One key for the whole test binary.
pub fn signing_key() -> Arc<SigningKeyPair> {
    static KEY: OnceLock<Arc<SigningKeyPair>> = OnceLock::new();
    Arc::clone(KEY.get_or_init(|| Arc::new(SigningKeyPair::generate_rsa().unwrap())))
}

/// Fixed key set.
pub struct StaticKeys(pub Arc<KeySet>);

impl StaticKeys {
    pub fn new() -> Self {
        Self(Arc::new(KeySet {
            active: signing_key(),
            previous: Vec::new(),
            expires_at: time::OffsetDateTime::now_utc() + time::Duration::hours(1),
        }))
    }
}

impl KeyManager for StaticKeys {
    fn key_set(&self) -> Arc<KeySet> {
        Arc::clone(&self.0)
    }
}

/// Upstream stand-in: its login page is `https://upstream.example.com/<id>`
/// and its callback route logs in whoever is named in the query.
pub struct FakeConnector {
    pub id: String,
    pub trusted_email: bool,
    pub groups: Option<Vec<String>>,
    pub unhealthy: Option<String>,
    pub prompts: Mutex<Vec<Option<String>>>,
}

impl FakeConnector {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            trusted_email: false,
            groups: None,
            unhealthy: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn trusted(mut self) -> Self {
        self.trusted_email = true;
        self
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = Some(groups.iter().map(|g| g.to_string()).collect());
        self
    }

    pub fn unhealthy(mut self, reason: &str) -> Self {
        self.unhealthy = Some(reason.to_string());
        self
    }
}

#[derive(Deserialize)]
struct CallbackQuery {
    state: String,
    user: String,
    email: Option<String>,
}

#[async_trait]
impl Connector for FakeConnector {
    fn id(&self) -> &str {
        &self.id
    }

    async fn login_url(&self, session_key: &str, prompt: Option<&str>) -> AuthResult<Url> {
        self.prompts
            .lock()
            .unwrap()
            .push(prompt.map(str::to_string));
        let mut url = Url::parse(&format!("https://upstream.example.com/{}", self.id)).unwrap();
        url.query_pairs_mut().append_pair("state", session_key);
        Ok(url)
    }

    fn routes(&self, ctx: ConnectorContext) -> Option<Router> {
        let handler = move |Query(q): Query<CallbackQuery>| {
            let ctx = ctx.clone();
            async move {
                let mut identity = Identity::new(q.user);
                if let Some(email) = q.email {
                    identity = identity.with_email(email);
                }
                match ctx.login.login(identity, &q.state).await {
                    Ok(location) => {
                        (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
                    }
                    Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
                }
            }
        };
        Some(Router::new().route("/callback", get(handler)))
    }

    fn trusted_email_provider(&self) -> bool {
        self.trusted_email
    }

    async fn healthy(&self) -> AuthResult<()> {
        match &self.unhealthy {
            Some(reason) => Err(tessera_auth::AuthError::connector(&self.id, reason)),
            None => Ok(()),
        }
    }

    fn groups(&self) -> Option<&dyn GroupsConnector> {
        self.groups.as_ref().map(|_| self as &dyn GroupsConnector)
    }
}

#[async_trait]
impl GroupsConnector for FakeConnector {
    async fn groups(&self, _remote_user_id: &str) -> AuthResult<Vec<String>> {
        Ok(self.groups.clone().unwrap_or_default())
    }
}

pub struct Harness {
    pub app: Router,
    pub stores: MemoryStores,
    pub sessions: Arc<SessionManager>,
    pub flow: Arc<AuthorizationFlow>,
    pub keys: Arc<dyn KeyManager>,
    pub connectors: Vec<Arc<FakeConnector>>,
    pub issuer: String,
}

pub struct HarnessBuilder {
    issuer: String,
    connectors: Vec<FakeConnector>,
    config: AuthConfig,
    keys: Option<Arc<dyn KeyManager>>,
}

impl HarnessBuilder {
    pub fn connector(mut self, connector: FakeConnector) -> Self {
        self.connectors.push(connector);
        self
    }

    pub fn config(mut self, f: impl FnOnce(&mut AuthConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn keys(mut self, keys: Arc<dyn KeyManager>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub async fn build(self) -> Harness {
        let stores = MemoryStores::new();
        stores
            .clients
            .seed([
                Client::new(CLIENT_ID, CLIENT_SECRET)
                    .with_redirect_url(Url::parse(CLIENT_REDIRECT).unwrap()),
                Client::new(PEER_ID, "peer-secret")
                    .with_redirect_url(Url::parse("http://peer.example.com/callback").unwrap())
                    .with_trusted_peer(CLIENT_ID),
                Client::new(CLI_ID, CLI_SECRET)
                    .into_public()
                    .with_redirect_url(Url::parse("urn:ietf:wg:oauth:2.0:oob").unwrap())
                    .with_redirect_url(Url::parse("http://localhost:8000").unwrap()),
            ])
            .unwrap();

        stores
            .users
            .create(
                &User::new("elroy-id")
                    .with_email("elroy@example.com", true)
                    .with_display_name("Elroy"),
            )
            .await
            .unwrap();
        stores
            .users
            .add_remote_identity("elroy-id", &RemoteIdentity::new("fake", "elroy-remote"))
            .await
            .unwrap();

        let mut registry = ConnectorRegistry::new(self.config.local_connector_id.clone());
        let connectors = if self.connectors.is_empty() {
            vec![FakeConnector::new("local"), FakeConnector::new("fake")]
        } else {
            self.connectors
        };
        let fakes: Vec<Arc<FakeConnector>> = connectors.into_iter().map(Arc::new).collect();
        for connector in &fakes {
            registry.register(Arc::clone(connector) as Arc<dyn Connector>).unwrap();
        }
        let registry = Arc::new(registry);

        let sessions = Arc::new(
            SessionManager::new(
                stores.sessions.clone(),
                stores.session_keys.clone(),
                self.config.session.session_lifetime,
                self.config.session.session_key_lifetime,
            )
            .with_generator(Arc::new(SequentialKeyGenerator::new())),
        );
        let issuer_url = Url::parse(&self.issuer).unwrap();
        let keys = self.keys.unwrap_or_else(|| Arc::new(StaticKeys::new()));

        let flow = Arc::new(AuthorizationFlow::new(
            stores.clients.clone(),
            stores.users.clone(),
            Arc::clone(&sessions),
            Arc::clone(&registry),
            issuer_url.clone(),
        ));
        let exchange = Arc::new(TokenExchange::new(
            stores.clients.clone(),
            stores.users.clone(),
            Arc::clone(&sessions),
            stores.refresh_tokens.clone(),
            Arc::clone(&keys),
            self.issuer.clone(),
            self.config.oauth.clone(),
        ));

        let app = router(IdpState {
            flow: Arc::clone(&flow),
            exchange,
            keys: Arc::clone(&keys),
            connectors: registry,
            issuer: issuer_url,
        });

        Harness {
            app,
            stores,
            sessions,
            flow,
            keys,
            connectors: fakes,
            issuer: self.issuer,
        }
    }
}

pub fn harness(issuer: &str) -> HarnessBuilder {
    HarnessBuilder {
        issuer: issuer.to_string(),
        connectors: Vec::new(),
        config: AuthConfig::default(),
        keys: None,
    }
}

pub async fn default_harness() -> Harness {
    harness("http://server.example.com").build().await
}

impl Harness {
    pub fn connector(&self, id: &str) -> &FakeConnector {
        self.connectors.iter().find(|c| c.id == id).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// `POST /token` with Basic credentials.
    pub async fn token(&self, path: &str, credentials: Option<(&str, &str)>, form: &str) -> Response<Body> {
        let mut request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some((id, secret)) = credentials {
            request = request.header(header::AUTHORIZATION, basic(id, secret));
        }
        self.send(request.body(Body::from(form.to_string())).unwrap())
            .await
    }

    /// Runs `/auth` and the fake connector's callback for `user`, returning
    /// the final redirect location.
    pub async fn login(&self, auth_query: &str, connector: &str, user: &str) -> String {
        let response = self.get(&format!("/auth?{auth_query}")).await;
        assert_eq!(response.status(), StatusCode::FOUND, "auth endpoint");
        let login_url = Url::parse(&location(&response)).unwrap();
        let key = query_param(&login_url, "state").unwrap();

        let response = self
            .get(&format!("/auth/{connector}/callback?state={key}&user={user}"))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND, "connector callback");
        location(&response)
    }
}

/// `Authorization` header value for HTTP Basic credentials.
pub fn basic(id: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
