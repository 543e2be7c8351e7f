//! Chamados core types and utilities
//!
//! Domain types shared by the HTTP client and the command line front end,
//! plus small formatting helpers and tracing setup.

pub mod chamado;
pub mod error;
pub mod files;
pub mod phone;
#[cfg(feature = "tracing")]
pub mod tracing;
pub mod types;

pub use chamado::{
    Attachment, Chamado, ChamadoSummary, ChamadoUpdate, DashboardStats, HistoryEntry, NewChamado,
    Priority, ServiceType, StatusChange, TicketFilter, TicketStatus,
};
pub use error::{CoreError, CoreResult, parse_base_url};
pub use types::{
    CreatedUser, MIN_PASSWORD_LEN, NewUser, Page, ProfileUpdate, Role, UserProfile, UserSummary,
    UserUpdate,
};
