//! Session state machine over the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use tessera_auth::session::{NewSession, SequentialKeyGenerator};
use tessera_auth::{AuthError, Identity, SessionManager, SessionState};
use tessera_db_memory::MemoryStores;
use url::Url;

fn manager(session_lifetime: Duration, key_lifetime: Duration) -> (SessionManager, MemoryStores) {
    let stores = MemoryStores::new();
    let manager = SessionManager::new(
        stores.sessions.clone(),
        stores.session_keys.clone(),
        session_lifetime,
        key_lifetime,
    )
    .with_generator(Arc::new(SequentialKeyGenerator::new()));
    (manager, stores)
}

fn params() -> NewSession {
    NewSession {
        connector_id: "fake".to_string(),
        client_id: "XXX".to_string(),
        client_state: Some("abc".to_string()),
        redirect_url: Url::parse("http://client.example.com/callback").unwrap(),
        scope: vec!["openid".to_string()],
        nonce: None,
        register: false,
    }
}

#[tokio::test]
async fn test_happy_path_transitions() {
    let (manager, _stores) = manager(Duration::from_secs(300), Duration::from_secs(600));

    let id = manager.new_session(params()).await.unwrap();
    assert_eq!(id, "code-1");
    assert_eq!(manager.get(&id).await.unwrap().state, SessionState::New);

    let key = manager.new_session_key(&id).await.unwrap();
    assert_eq!(manager.exchange_key(&key).await.unwrap(), id);

    let session = manager
        .attach_remote_identity(&id, Identity::new("remote-1").with_email("a@example.com"))
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Identified);

    let session = manager.attach_user(&id, "user-1").await.unwrap();
    assert_eq!(session.state, SessionState::Authenticated);
    assert!(session.is_redeemable());

    let session = manager
        .add_groups(&id, vec!["admins".to_string()])
        .await
        .unwrap();
    assert_eq!(session.groups, vec!["admins"]);

    let before = manager.kill(&id).await.unwrap();
    assert_eq!(before.state, SessionState::Authenticated);
    assert_eq!(manager.get(&id).await.unwrap().state, SessionState::Dead);
}

#[tokio::test]
async fn test_transitions_are_guarded() {
    let (manager, _stores) = manager(Duration::from_secs(300), Duration::from_secs(600));
    let id = manager.new_session(params()).await.unwrap();

    assert!(matches!(
        manager.attach_user(&id, "user-1").await,
        Err(AuthError::InvalidState { .. })
    ));

    manager
        .attach_remote_identity(&id, Identity::new("remote-1"))
        .await
        .unwrap();
    assert!(matches!(
        manager.attach_remote_identity(&id, Identity::new("remote-2")).await,
        Err(AuthError::InvalidState { .. })
    ));

    manager.kill(&id).await.unwrap();
    assert!(manager.attach_user(&id, "user-1").await.is_err());
    assert!(manager.add_groups(&id, Vec::new()).await.is_err());
}

#[tokio::test]
async fn test_keys_are_one_time() {
    let (manager, _stores) = manager(Duration::from_secs(300), Duration::from_secs(600));
    let id = manager.new_session(params()).await.unwrap();
    let key = manager.new_session_key(&id).await.unwrap();

    manager.exchange_key(&key).await.unwrap();
    assert!(matches!(
        manager.exchange_key(&key).await,
        Err(AuthError::NotFound { .. })
    ));
    assert!(manager.exchange_key("never-issued").await.is_err());
}

#[tokio::test]
async fn test_expired_key_and_session() {
    let (manager, stores) = manager(Duration::ZERO, Duration::ZERO);
    let id = manager.new_session(params()).await.unwrap();
    let key = manager.new_session_key(&id).await.unwrap();

    assert!(manager.exchange_key(&key).await.is_err());
    assert!(matches!(
        manager.get(&id).await,
        Err(AuthError::NotFound { .. })
    ));
    assert!(
        manager
            .attach_remote_identity(&id, Identity::new("remote-1"))
            .await
            .is_err()
    );

    manager.new_session_key(&id).await.unwrap();
    let (sessions, keys) = manager.purge().await.unwrap();
    assert_eq!((sessions, keys), (1, 1));
    assert!(stores.sessions.is_empty());
    assert!(stores.session_keys.is_empty());
}
