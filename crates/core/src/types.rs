use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to a helpdesk account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "tecnico")]
    Technician,
    #[serde(rename = "usuario")]
    Requester,
}

impl Role {
    /// Wire name used by the backend
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Technician => "tecnico",
            Self::Requester => "usuario",
        }
    }

    /// Technicians and administrators may triage tickets they did not open
    pub const fn can_triage(self) -> bool {
        matches!(self, Self::Admin | Self::Technician)
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "tecnico" | "technician" => Ok(Self::Technician),
            "usuario" | "requester" => Ok(Self::Requester),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Profile of the authenticated user, as returned by `/usuarios/perfil/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "nome_completo")]
    pub display_name: String,
    #[serde(rename = "tipo_usuario")]
    pub role: Role,
    #[serde(rename = "departamento", default)]
    pub department: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "ativo", default = "default_active")]
    pub active: bool,
    #[serde(rename = "iniciais", default)]
    pub initials: String,
    #[serde(rename = "criado_em", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "atualizado_em", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

const fn default_active() -> bool {
    true
}

impl UserProfile {
    /// Initials for compact display, derived from the display name when the
    /// backend did not send them
    pub fn initials(&self) -> String {
        if !self.initials.is_empty() {
            return self.initials.clone();
        }
        let mut words = self.display_name.split_whitespace();
        let first = words.next().and_then(|w| w.chars().next());
        let last = words.last().and_then(|w| w.chars().next());
        match (first, last) {
            (Some(a), Some(b)) => format!("{a}{b}").to_uppercase(),
            (Some(a), None) => a.to_uppercase().to_string(),
            _ => self.username.chars().take(2).collect::<String>().to_uppercase(),
        }
    }
}

/// Partial profile update sent to `/usuarios/perfil/atualizar/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "nome_completo", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "departamento", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.display_name.is_none()
            && self.department.is_none()
            && self.phone.is_none()
    }
}

/// Shortest password the backend accepts for new accounts
pub const MIN_PASSWORD_LEN: usize = 8;

/// Payload for `POST /usuarios/`, the administrator's account form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(rename = "nome_completo")]
    pub display_name: String,
    #[serde(rename = "tipo_usuario")]
    pub role: Role,
    #[serde(rename = "departamento", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl NewUser {
    /// Account with the password confirmed and no optional fields
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        password: impl Into<String>,
        role: Role,
    ) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            email: String::new(),
            password_confirm: password.clone(),
            password,
            display_name: display_name.into(),
            role,
            department: None,
            phone: None,
        }
    }

    /// Checks the backend would reject anyway, done before the round trip
    pub fn validate(&self) -> CoreResult<()> {
        if self.username.trim().is_empty() || self.display_name.trim().is_empty() {
            return Err(CoreError::invalid_config("username and full name are required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::invalid_config(format!(
                "password must have at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.password != self.password_confirm {
            return Err(CoreError::invalid_config("passwords do not match"));
        }
        Ok(())
    }
}

/// What `POST /usuarios/` echoes back; the password fields are write-only
/// and the id is not included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUser {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "nome_completo")]
    pub display_name: String,
    #[serde(rename = "tipo_usuario")]
    pub role: Role,
    #[serde(rename = "departamento", default)]
    pub department: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
}

/// Partial account update sent with `PATCH /usuarios/{id}/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "nome_completo", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "tipo_usuario", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "departamento", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "ativo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Compact user reference embedded in tickets and listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "nome_completo")]
    pub display_name: String,
    #[serde(rename = "tipo_usuario", default)]
    pub role: Option<Role>,
    #[serde(rename = "iniciais", default)]
    pub initials: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub const fn has_more(&self) -> bool {
        self.next.is_some()
    }
}
