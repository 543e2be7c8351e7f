//! Typed access to the helpdesk resources
//!
//! Every call goes through [`SessionManager`](crate::session::SessionManager),
//! so expired tokens are renewed without the caller noticing.

pub mod chamados;
pub mod usuarios;

pub use chamados::{AttachmentUpload, ChamadoService, TicketCreation};
pub use usuarios::{UserFilter, UsuarioService};

use chamados_core::Page;
use serde::Deserialize;

/// List endpoints answer either with a paginated envelope or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Paged(Page<T>),
    Plain(Vec<T>),
}

impl<T> From<Listing<T>> for Page<T> {
    fn from(listing: Listing<T>) -> Self {
        match listing {
            Listing::Paged(page) => page,
            Listing::Plain(results) => Self {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        }
    }
}
