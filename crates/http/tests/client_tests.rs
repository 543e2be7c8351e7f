//! Integration tests for the helpdesk client and login flow

mod common;

use chamados_core::Role;
use chamados_http::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use chamados_http::{
    ClientError, FileStorage, HelpdeskClient, MemoryStorage, SessionEvent, SessionManager,
    SessionState,
};
use common::{PROFILE_PATH, REFRESH_PATH, access_token, bearer, profile_json, stored};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_client_builder() {
    let client = HelpdeskClient::builder()
        .base_url("http://localhost:8001/api/")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    assert_eq!(client.base_url(), "http://localhost:8001/api");
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = HelpdeskClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));

    let result = HelpdeskClient::new("ftp://example.com");
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_login_stores_tokens_and_profile() {
    let server = MockServer::start().await;
    let access = access_token(3600, "login");

    Mock::given(method("POST"))
        .and(path("/usuarios/login/"))
        .and(body_json(json!({ "username": "maria", "password": "segredo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": access,
            "refresh": "refresh-1",
            "user": profile_json(),
            "message": "Login realizado com sucesso"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let session = SessionManager::new(HelpdeskClient::new(server.uri()).unwrap(), storage.clone());
    let mut events = session.subscribe_events();
    assert_eq!(session.state(), SessionState::Anonymous);

    let user = session.login("maria", "segredo").await.unwrap();

    assert_eq!(user.username, "maria");
    assert_eq!(user.role, Role::Requester);
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.current_user().unwrap().id, 7);
    assert_eq!(stored(&storage, ACCESS_TOKEN_KEY).as_deref(), Some(access.as_str()));
    assert_eq!(stored(&storage, REFRESH_TOKEN_KEY).as_deref(), Some("refresh-1"));
    assert!(stored(&storage, USER_KEY).is_some());
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedIn {
            user_id: 7,
            username: "maria".into()
        }
    );
}

#[tokio::test]
async fn test_login_rejected_with_backend_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/usuarios/login/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Credenciais inválidas" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let session = SessionManager::new(HelpdeskClient::new(server.uri()).unwrap(), storage.clone());

    let err = session.login("maria", "errada").await.unwrap_err();

    assert!(matches!(&err, ClientError::InvalidCredentials(msg) if msg == "Credenciais inválidas"));
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(session.current_user().is_none());
    assert!(stored(&storage, ACCESS_TOKEN_KEY).is_none());
}

#[tokio::test]
async fn test_login_server_error_is_not_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/usuarios/login/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let session = SessionManager::new(
        HelpdeskClient::new(server.uri()).unwrap(),
        Arc::new(MemoryStorage::new()),
    );

    let err = session.login("maria", "segredo").await.unwrap_err();
    assert!(matches!(err, ClientError::ServerError { status: 503, .. }));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_profile_after_login_needs_no_refresh() {
    let server = MockServer::start().await;
    let access = access_token(3600, "fresh");

    Mock::given(method("POST"))
        .and(path("/usuarios/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": access,
            "refresh": "refresh-1",
            "user": profile_json()
        })))
        .mount(&server)
        .await;

    let mut updated = profile_json();
    updated["departamento"] = json!("TI");
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", bearer(&access).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = SessionManager::new(
        HelpdeskClient::new(server.uri()).unwrap(),
        Arc::new(MemoryStorage::new()),
    );
    session.login("maria", "segredo").await.unwrap();

    let profile = session.get_profile().await.unwrap();
    assert_eq!(profile.department.as_deref(), Some("TI"));
    assert_eq!(
        session.current_user().unwrap().department.as_deref(),
        Some("TI")
    );
}

#[tokio::test]
async fn test_session_survives_restart_with_file_storage() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/usuarios/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": access_token(3600, "persisted"),
            "refresh": "refresh-1",
            "user": profile_json()
        })))
        .mount(&server)
        .await;

    {
        let session = SessionManager::new(
            HelpdeskClient::new(server.uri()).unwrap(),
            Arc::new(FileStorage::new(&file)),
        );
        session.login("maria", "segredo").await.unwrap();
    }

    let resumed = SessionManager::new(
        HelpdeskClient::new(server.uri()).unwrap(),
        Arc::new(FileStorage::new(&file)),
    );
    assert!(resumed.is_authenticated());
    assert_eq!(resumed.current_user().unwrap().display_name, "Maria da Silva");
    assert!(resumed.has_refresh_token());
}
