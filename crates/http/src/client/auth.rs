//! Authentication API client methods
//!
//! These calls carry no session of their own; the session manager decides
//! what to do with their results.

use super::{ClientError, HelpdeskClient, check_response, decode_response, error_from_response};
use crate::types::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
use reqwest::{Method, StatusCode, header};

pub const LOGIN_PATH: &str = "/usuarios/login/";
pub const LOGOUT_PATH: &str = "/usuarios/logout/";
pub const REFRESH_PATH: &str = "/usuarios/token/refresh/";
pub const PROFILE_PATH: &str = "/usuarios/perfil/";
pub const PROFILE_UPDATE_PATH: &str = "/usuarios/perfil/atualizar/";

impl HelpdeskClient {
    /// Exchange credentials for a token pair
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let response = self
            .request(Method::POST, LOGIN_PATH)
            .json(request)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(match error_from_response(response).await {
                ClientError::AuthenticationFailed(msg) => ClientError::InvalidCredentials(msg),
                other => other,
            });
        }
        decode_response(response).await
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh_access(&self, refresh: &str) -> Result<RefreshResponse, ClientError> {
        let response = self
            .request(Method::POST, REFRESH_PATH)
            .json(&RefreshRequest {
                refresh: refresh.to_string(),
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
                Err(match error_from_response(response).await {
                    ClientError::AuthenticationFailed(msg) | ClientError::BadRequest(msg) => {
                        ClientError::RefreshInvalid(msg)
                    }
                    other => other,
                })
            }
            _ => decode_response(response).await,
        }
    }

    /// Tell the backend the session is over
    pub async fn logout(&self, access: Option<&str>) -> Result<(), ClientError> {
        let mut request = self.request(Method::POST, LOGOUT_PATH);
        if let Some(token) = access {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        check_response(request.send().await?).await
    }
}
