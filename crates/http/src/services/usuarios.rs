//! User directory endpoints

use super::Listing;
use crate::client::error::ClientError;
use crate::session::SessionManager;
use chamados_core::{CreatedUser, NewUser, Page, Role, UserProfile, UserSummary, UserUpdate};
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;

const USERS_PATH: &str = "/usuarios/";
const TECHNICIANS_PATH: &str = "/usuarios/tecnicos/";

/// Query parameters for the user listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserFilter {
    #[serde(rename = "tipo_usuario", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "ativo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// User directory and account administration
#[derive(Debug, Clone)]
pub struct UsuarioService {
    session: Arc<SessionManager>,
}

impl UsuarioService {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Page<UserProfile>, ClientError> {
        let listing: Listing<UserProfile> = self
            .session
            .execute(|client| client.request(Method::GET, USERS_PATH).query(filter))
            .await?;
        Ok(listing.into())
    }

    pub async fn get(&self, id: i64) -> Result<UserProfile, ClientError> {
        let path = format!("/usuarios/{id}/");
        self.session
            .execute(|client| client.request(Method::GET, &path))
            .await
    }

    /// Create an account. The payload is validated locally first.
    pub async fn create(&self, user: &NewUser) -> Result<CreatedUser, ClientError> {
        user.validate()
            .map_err(|e| ClientError::BadRequest(e.to_string()))?;
        self.session
            .execute(|client| client.request(Method::POST, USERS_PATH).json(user))
            .await
    }

    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<UserProfile, ClientError> {
        let path = format!("/usuarios/{id}/");
        self.session
            .execute(|client| client.request(Method::PATCH, &path).json(update))
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let path = format!("/usuarios/{id}/");
        self.session
            .execute_empty(|client| client.request(Method::DELETE, &path))
            .await
    }

    /// Active technicians a ticket can be assigned to
    pub async fn technicians(&self) -> Result<Vec<UserSummary>, ClientError> {
        let listing: Listing<UserSummary> = self
            .session
            .execute(|client| client.request(Method::GET, TECHNICIANS_PATH))
            .await?;
        Ok(Page::from(listing).results)
    }
}
