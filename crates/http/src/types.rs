//! Wire types of the authentication endpoints

use chamados_core::UserProfile;
use serde::{Deserialize, Serialize};

/// `POST /usuarios/login/` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /usuarios/login/` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserProfile,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /usuarios/token/refresh/` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// `POST /usuarios/token/refresh/` response.
///
/// When the backend rotates refresh tokens it also returns a new `refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
