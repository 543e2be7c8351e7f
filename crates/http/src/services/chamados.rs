//! Ticket endpoints

use super::Listing;
use crate::client::error::ClientError;
use crate::session::SessionManager;
use chamados_core::files::guess_mime_type;
use chamados_core::{
    Attachment, Chamado, ChamadoSummary, ChamadoUpdate, DashboardStats, NewChamado, Page,
    ServiceType, StatusChange, TicketFilter,
};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CHAMADOS_PATH: &str = "/chamados/";
const MY_TICKETS_PATH: &str = "/chamados/meus-chamados/";
const TECHNICIAN_TICKETS_PATH: &str = "/chamados/chamados-tecnico/";
const STATISTICS_PATH: &str = "/chamados/estatisticas/";
const SERVICE_TYPES_PATH: &str = "/chamados/tipos-servico/";

/// Multipart field the backend reads the file from
const ATTACHMENT_FIELD: &str = "arquivo";

fn ticket_path(id: i64) -> String {
    format!("/chamados/{id}/")
}

/// A file to attach to a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AttachmentUpload {
    /// Wrap file contents, guessing the MIME type from the extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = guess_mime_type(&file_name).to_string();
        Self {
            file_name,
            bytes,
            mime_type,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    fn part(&self) -> Part {
        let part = Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        match part.mime_str(&self.mime_type) {
            Ok(part) => part,
            Err(_) => Part::bytes(self.bytes.clone()).file_name(self.file_name.clone()),
        }
    }

    fn form(&self) -> Form {
        Form::new().part(ATTACHMENT_FIELD, self.part())
    }
}

/// Outcome of creating a ticket together with its attachments.
///
/// The ticket exists as soon as `chamado` is set; attachments that failed are
/// listed in `failures` and can be retried individually.
#[derive(Debug)]
pub struct TicketCreation {
    pub chamado: Chamado,
    pub attachments: Vec<Attachment>,
    pub failures: Vec<ClientError>,
}

impl TicketCreation {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ticket operations
#[derive(Debug, Clone)]
pub struct ChamadoService {
    session: Arc<SessionManager>,
}

impl ChamadoService {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    async fn listing<T>(&self, path: &str, filter: &TicketFilter) -> Result<Page<T>, ClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        let listing: Listing<T> = self
            .session
            .execute(|client| client.request(Method::GET, path).query(filter))
            .await?;
        Ok(listing.into())
    }

    /// Tickets visible to the current user
    pub async fn list(&self, filter: &TicketFilter) -> Result<Page<ChamadoSummary>, ClientError> {
        self.listing(CHAMADOS_PATH, filter).await
    }

    /// Tickets opened by the current user
    pub async fn my_tickets(
        &self,
        filter: &TicketFilter,
    ) -> Result<Page<ChamadoSummary>, ClientError> {
        self.listing(MY_TICKETS_PATH, filter).await
    }

    /// Tickets assigned to the current technician
    pub async fn technician_tickets(
        &self,
        filter: &TicketFilter,
    ) -> Result<Page<ChamadoSummary>, ClientError> {
        self.listing(TECHNICIAN_TICKETS_PATH, filter).await
    }

    pub async fn get(&self, id: i64) -> Result<Chamado, ClientError> {
        let path = ticket_path(id);
        self.session
            .execute(|client| client.request(Method::GET, &path))
            .await
    }

    pub async fn create(&self, ticket: &NewChamado) -> Result<Chamado, ClientError> {
        let created: Chamado = self
            .session
            .execute(|client| client.request(Method::POST, CHAMADOS_PATH).json(ticket))
            .await?;
        info!(id = created.id, number = %created.number, "Ticket created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, update: &ChamadoUpdate) -> Result<Chamado, ClientError> {
        let path = ticket_path(id);
        self.session
            .execute(|client| client.request(Method::PATCH, &path).json(update))
            .await
    }

    pub async fn update_status(
        &self,
        id: i64,
        change: &StatusChange,
    ) -> Result<Chamado, ClientError> {
        let path = format!("/chamados/{id}/status/");
        let updated: Chamado = self
            .session
            .execute(|client| client.request(Method::PATCH, &path).json(change))
            .await?;
        info!(id, status = %updated.status, "Ticket status changed");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let path = ticket_path(id);
        self.session
            .execute_empty(|client| client.request(Method::DELETE, &path))
            .await?;
        info!(id, "Ticket deleted");
        Ok(())
    }

    /// Upload one file to an existing ticket
    pub async fn upload_attachment(
        &self,
        id: i64,
        upload: &AttachmentUpload,
    ) -> Result<Attachment, ClientError> {
        let path = format!("/chamados/{id}/anexos/");
        debug!(
            id,
            file = %upload.file_name,
            size = upload.bytes.len(),
            "Uploading attachment"
        );
        self.session
            .execute(|client| client.request(Method::POST, &path).multipart(upload.form()))
            .await
            .map_err(|e| ClientError::AttachmentUpload {
                file_name: upload.file_name.clone(),
                source: Box::new(e),
            })
    }

    pub async fn delete_attachment(&self, attachment_id: i64) -> Result<(), ClientError> {
        let path = format!("/chamados/anexos/{attachment_id}/");
        self.session
            .execute_empty(|client| client.request(Method::DELETE, &path))
            .await
    }

    /// Create a ticket, then upload its attachments one by one.
    ///
    /// Failing to create the ticket is an error. Failing to upload an
    /// attachment is not: the remaining files are still sent and the
    /// failures are reported in the result.
    pub async fn create_with_attachments(
        &self,
        ticket: &NewChamado,
        uploads: &[AttachmentUpload],
    ) -> Result<TicketCreation, ClientError> {
        let chamado = self.create(ticket).await?;

        let mut attachments = Vec::with_capacity(uploads.len());
        let mut failures = Vec::new();
        for upload in uploads {
            match self.upload_attachment(chamado.id, upload).await {
                Ok(attachment) => attachments.push(attachment),
                Err(e) => {
                    warn!(ticket = chamado.id, "{e}");
                    failures.push(e);
                }
            }
        }

        Ok(TicketCreation {
            chamado,
            attachments,
            failures,
        })
    }

    /// Dashboard counters for the current user
    pub async fn statistics(&self) -> Result<DashboardStats, ClientError> {
        self.session
            .execute(|client| client.request(Method::GET, STATISTICS_PATH))
            .await
    }

    /// Service categories a ticket can be filed under
    pub async fn service_types(&self) -> Result<Vec<ServiceType>, ClientError> {
        let listing: Listing<ServiceType> = self
            .session
            .execute(|client| client.request(Method::GET, SERVICE_TYPES_PATH))
            .await?;
        Ok(Page::from(listing).results)
    }
}
