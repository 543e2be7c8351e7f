//! Shared fixtures for the integration tests

#![allow(dead_code)]

use chamados_http::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use chamados_http::{HelpdeskClient, MemoryStorage, SessionManager, SessionStorage, StorageBatch};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

pub const REFRESH_PATH: &str = "/usuarios/token/refresh/";
pub const PROFILE_PATH: &str = "/usuarios/perfil/";

/// Mint an HS256 access token expiring `ttl_secs` from now
pub fn access_token(ttl_secs: i64, jti: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    encode(
        &Header::default(),
        &json!({
            "token_type": "access",
            "exp": now + ttl_secs,
            "iat": now,
            "jti": jti,
            "user_id": 7
        }),
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

pub fn profile_json() -> Value {
    json!({
        "id": 7,
        "username": "maria",
        "email": "maria@example.com",
        "nome_completo": "Maria da Silva",
        "tipo_usuario": "usuario",
        "departamento": "Financeiro",
        "telefone": "11987654321",
        "ativo": true,
        "iniciais": "MS"
    })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Storage pre-seeded as if a login had already happened
pub fn seeded_storage(access: Option<&str>, refresh: Option<&str>) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    let mut batch = StorageBatch::new().set(USER_KEY, profile_json().to_string());
    if let Some(access) = access {
        batch = batch.set(ACCESS_TOKEN_KEY, access);
    }
    if let Some(refresh) = refresh {
        batch = batch.set(REFRESH_TOKEN_KEY, refresh);
    }
    storage.apply(batch).unwrap();
    storage
}

pub fn session_with(server: &MockServer, storage: Arc<MemoryStorage>) -> Arc<SessionManager> {
    let client = HelpdeskClient::new(server.uri()).unwrap();
    Arc::new(SessionManager::new(client, storage))
}

pub fn stored(storage: &MemoryStorage, key: &str) -> Option<String> {
    storage.get(key).unwrap()
}
