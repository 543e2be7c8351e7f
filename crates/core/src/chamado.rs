//! Ticket ("chamado") types exchanged with the `/chamados/` endpoints

use crate::types::{Role, UserSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    #[serde(rename = "aberto")]
    Open,
    #[serde(rename = "em_atendimento")]
    InProgress,
    #[serde(rename = "encerrado")]
    Closed,
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl TicketStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "aberto",
            Self::InProgress => "em_atendimento",
            Self::Closed => "encerrado",
            Self::Cancelled => "cancelado",
        }
    }

    /// Open and in-progress tickets still need attention
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }

    /// Whether a user may move a ticket into this status.
    ///
    /// Closing is allowed for staff and for the ticket's requester; starting
    /// work or cancelling is reserved to staff. Reopening is left to the
    /// backend to decide.
    pub const fn can_be_set_by(self, role: Role, is_requester: bool) -> bool {
        match self {
            Self::Closed => role.can_triage() || is_requester,
            Self::InProgress | Self::Cancelled => role.can_triage(),
            Self::Open => true,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aberto" | "open" => Ok(Self::Open),
            "em_atendimento" | "in-progress" | "in_progress" => Ok(Self::InProgress),
            "encerrado" | "closed" => Ok(Self::Closed),
            "cancelado" | "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown ticket status '{other}'")),
        }
    }
}

/// Ticket priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "baixa")]
    Low,
    #[default]
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "urgente")]
    Urgent,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "baixa",
            Self::Medium => "media",
            Self::High => "alta",
            Self::Urgent => "urgente",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baixa" | "low" => Ok(Self::Low),
            "media" | "medium" => Ok(Self::Medium),
            "alta" | "high" => Ok(Self::High),
            "urgente" | "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

/// Category a ticket is filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceType {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "ativo", default)]
    pub active: bool,
}

/// File attached to a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    #[serde(rename = "arquivo")]
    pub file_url: String,
    #[serde(rename = "nome_original")]
    pub original_name: String,
    #[serde(rename = "tamanho")]
    pub size: u64,
    #[serde(rename = "tamanho_formatado", default)]
    pub formatted_size: String,
    #[serde(rename = "tipo_arquivo")]
    pub mime_type: String,
    #[serde(rename = "enviado_por", default)]
    pub uploaded_by: Option<UserSummary>,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
}

/// Audit trail entry of a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(rename = "tipo_acao")]
    pub action: String,
    #[serde(rename = "tipo_acao_display", default)]
    pub action_label: Option<String>,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "usuario", default)]
    pub user: Option<UserSummary>,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
}

/// Full ticket as returned by `GET /chamados/{id}/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chamado {
    pub id: i64,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "tipo_servico")]
    pub service_type: ServiceType,
    pub status: TicketStatus,
    #[serde(rename = "prioridade")]
    pub priority: Priority,
    #[serde(rename = "equipamento", default)]
    pub equipment: Option<String>,
    #[serde(rename = "localizacao", default)]
    pub location: Option<String>,
    #[serde(rename = "solicitante")]
    pub requester: UserSummary,
    #[serde(rename = "tecnico_responsavel", default)]
    pub technician: Option<UserSummary>,
    #[serde(rename = "observacoes_tecnico", default)]
    pub technician_notes: Option<String>,
    #[serde(rename = "anexos", default)]
    pub attachments: Vec<Attachment>,
    #[serde(rename = "historico", default)]
    pub history: Vec<HistoryEntry>,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizado_em")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "atendido_em", default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "encerrado_em", default)]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Ticket row as returned by the list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChamadoSummary {
    pub id: i64,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "tipo_servico_nome", default)]
    pub service_type: Option<String>,
    pub status: TicketStatus,
    #[serde(rename = "prioridade")]
    pub priority: Priority,
    #[serde(rename = "solicitante_nome", default)]
    pub requester: Option<String>,
    #[serde(rename = "tecnico_responsavel", default)]
    pub technician: Option<UserSummary>,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizado_em")]
    pub updated_at: DateTime<Utc>,
}

/// Payload for `POST /chamados/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChamado {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "tipo_servico")]
    pub service_type: i64,
    #[serde(rename = "prioridade", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "equipamento", skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(rename = "localizacao", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Partial update sent with `PATCH /chamados/{id}/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChamadoUpdate {
    #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(rename = "prioridade", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "equipamento", skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(rename = "localizacao", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "tecnico_responsavel", skip_serializing_if = "Option::is_none")]
    pub technician: Option<i64>,
    #[serde(rename = "observacoes_tecnico", skip_serializing_if = "Option::is_none")]
    pub technician_notes: Option<String>,
}

/// Payload for `PATCH /chamados/{id}/status/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: TicketStatus,
    #[serde(rename = "observacoes_tecnico", skip_serializing_if = "Option::is_none")]
    pub technician_notes: Option<String>,
}

/// Aggregate counters shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(rename = "total_chamados")]
    pub total: u64,
    #[serde(rename = "chamados_abertos")]
    pub open: u64,
    #[serde(rename = "chamados_em_atendimento")]
    pub in_progress: u64,
    #[serde(rename = "chamados_encerrados")]
    pub closed: u64,
    #[serde(rename = "chamados_urgentes")]
    pub urgent: u64,
    #[serde(rename = "meus_chamados")]
    pub mine: u64,
    #[serde(rename = "meus_chamados_pendentes")]
    pub mine_pending: u64,
}

/// Query parameters accepted by the ticket list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(rename = "prioridade", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "tipo_servico", skip_serializing_if = "Option::is_none")]
    pub service_type: Option<i64>,
    #[serde(rename = "search", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "ultimos_dias", skip_serializing_if = "Option::is_none")]
    pub last_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}
