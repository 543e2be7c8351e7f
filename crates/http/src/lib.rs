//! Chamados helpdesk client
//!
//! [`HelpdeskClient`] is the bare transport. [`SessionManager`] owns the
//! login session: it stores the token pair, renews the access token when the
//! backend rejects it, and ends the session when that is no longer possible.
//! The resource services in [`services`] sit on top of it.

pub mod client;
pub mod services;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

pub use client::error::ClientError;
pub use client::{HelpdeskClient, HelpdeskClientBuilder};
pub use services::{AttachmentUpload, ChamadoService, TicketCreation, UserFilter, UsuarioService};
pub use session::{
    ExpiryMonitor, LogoutReason, MonitorAction, MonitorConfig, MonitorHandle, SessionEvent,
    SessionManager, SessionState,
};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, SessionStore, StorageBatch};
pub use token::{AccessClaims, TokenError, decode_claims, seconds_until_expiry};

pub type Result<T> = std::result::Result<T, ClientError>;
