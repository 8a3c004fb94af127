use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tessera_auth::session::SessionManager;
use tessera_auth::storage::RefreshTokenStorage;
use tessera_auth::{
    AuthorizationFlow, Connector, ConnectorRegistry, IdpState, KeyManager, RotatingKeyManager,
    TokenExchange,
};
use tessera_db_memory::MemoryStores;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;

/// How often the signing key's remaining lifetime is checked.
const KEY_CHECK_INTERVAL: Duration = Duration::from_secs(60);

pub struct TesseraServer {
    addr: SocketAddr,
    app: Router,
    maintenance: Maintenance,
}

/// Wraps the identity provider routes in the HTTP middleware stack.
pub fn build_app(cfg: &AppConfig, idp: IdpState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    tessera_auth::router(idp)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    config: AppConfig,
    connectors: Vec<Arc<dyn Connector>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            connectors: Vec::new(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connectors.push(connector);
        self
    }

    /// Wires stores, connectors, keys and the router together.
    pub async fn build(self) -> anyhow::Result<TesseraServer> {
        let cfg = self.config;
        cfg.validate().map_err(anyhow::Error::msg)?;
        let auth = &cfg.auth;
        let issuer = auth.issuer_url()?;
        let issuer_str = auth.issuer.trim_end_matches('/').to_string();

        let stores = MemoryStores::new();
        let seeded = stores.clients.seed(cfg.clients.iter().cloned())?;
        tracing::info!(clients = seeded, "clients loaded");

        let mut registry = ConnectorRegistry::new(auth.local_connector_id.clone());
        for connector in self.connectors {
            registry.register(connector)?;
        }
        if registry.is_empty() {
            tracing::warn!("no connectors registered; every authorization request will fail");
        }
        let failures = registry.sync_all().await;
        if failures > 0 {
            tracing::warn!(failures, "some connectors failed their initial sync");
        }
        let registry = Arc::new(registry);

        let rotation_interval = auth.keys.rotation_interval;
        let expiry_grace = auth.keys.expiry_grace;
        let keys = tokio::task::spawn_blocking(move || {
            RotatingKeyManager::generate(rotation_interval, expiry_grace)
        })
        .await
        .context("key generation task failed")??;
        let keys = Arc::new(keys);
        tracing::info!(kid = %keys.key_set().active.kid, "signing key generated");

        let sessions = Arc::new(SessionManager::new(
            stores.sessions.clone(),
            stores.session_keys.clone(),
            auth.session.session_lifetime,
            auth.session.session_key_lifetime,
        ));

        let flow = Arc::new(AuthorizationFlow::new(
            stores.clients.clone(),
            stores.users.clone(),
            Arc::clone(&sessions),
            Arc::clone(&registry),
            issuer.clone(),
        ));
        let exchange = Arc::new(TokenExchange::new(
            stores.clients.clone(),
            stores.users.clone(),
            Arc::clone(&sessions),
            stores.refresh_tokens.clone(),
            keys.clone(),
            issuer_str,
            auth.oauth.clone(),
        ));

        let idp = IdpState {
            flow,
            exchange,
            keys: keys.clone(),
            connectors: registry,
            issuer,
        };
        let app = build_app(&cfg, idp);

        Ok(TesseraServer {
            addr: cfg.addr(),
            app,
            maintenance: Maintenance {
                sessions,
                refresh_tokens: stores.refresh_tokens.clone(),
                keys,
                purge_interval: auth.session.purge_interval,
            },
        })
    }
}

impl TesseraServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The assembled router, without background tasks.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` resolves, running the purge and
    /// key rotation tasks meanwhile.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let tasks = self.maintenance.spawn();
        let result = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await;
        for task in tasks {
            task.abort();
        }
        result?;
        Ok(())
    }
}

struct Maintenance {
    sessions: Arc<SessionManager>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    keys: Arc<RotatingKeyManager>,
    purge_interval: Duration,
}

impl Maintenance {
    fn spawn(self) -> Vec<JoinHandle<()>> {
        let purge = tokio::spawn(purge_loop(
            self.sessions,
            self.refresh_tokens,
            self.purge_interval,
        ));
        let rotate = tokio::spawn(rotation_loop(self.keys));
        vec![purge, rotate]
    }
}

async fn purge_loop(
    sessions: Arc<SessionManager>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match sessions.purge().await {
            Ok((sessions, keys)) if sessions + keys > 0 => {
                tracing::debug!(sessions, keys, "purged expired sessions");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "session purge failed"),
        }
        match refresh_tokens.cleanup_expired().await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(refresh_tokens = n, "purged expired refresh tokens"),
            Err(e) => tracing::warn!(error = %e, "refresh token purge failed"),
        }
    }
}

async fn rotation_loop(keys: Arc<RotatingKeyManager>) {
    let mut interval = tokio::time::interval(KEY_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        let manager = Arc::clone(&keys);
        let rotated = tokio::task::spawn_blocking(move || {
            manager.rotate_if_due(OffsetDateTime::now_utc())
        })
        .await;
        match rotated {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "signing key rotation failed"),
            Err(e) => tracing::error!(error = %e, "signing key rotation task panicked"),
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
