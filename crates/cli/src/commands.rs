//! CLI commands

use anyhow::{Context, Result, bail};
use chamados_core::{
    Chamado, ChamadoSummary, NewChamado, NewUser, Page, Priority, ProfileUpdate, Role,
    StatusChange, TicketFilter, TicketStatus, UserProfile, UserUpdate, files, phone,
};
use chamados_http::{
    AttachmentUpload, ChamadoService, ClientError, ExpiryMonitor, FileStorage, HelpdeskClient,
    SessionEvent, SessionManager, UserFilter, UsuarioService,
};
use clap::Subcommand;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::config::CliConfig;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        username: String,

        /// Password; read from stdin when omitted
        #[arg(long, env = "CHAMADOS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Profile operations
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Ticket operations
    Tickets {
        #[command(subcommand)]
        command: TicketCommands,
    },

    /// User account administration
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show dashboard counters
    Stats,

    /// List the service categories tickets can be filed under
    ServiceTypes,

    /// Watch the session and report expiry warnings until it ends
    Monitor,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Update profile fields
    Update {
        #[arg(long)]
        email: Option<String>,

        /// Full display name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        department: Option<String>,

        /// Mobile number with area code, 11 digits
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TicketCommands {
    /// List tickets
    List {
        /// Only tickets I opened
        #[arg(long, conflicts_with = "assigned")]
        mine: bool,

        /// Only tickets assigned to me
        #[arg(long)]
        assigned: bool,

        #[arg(long)]
        status: Option<TicketStatus>,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        search: Option<String>,

        /// Only tickets from the last N days
        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        page: Option<u32>,
    },

    /// Show one ticket with attachments and history
    Show { id: i64 },

    /// Open a new ticket
    Create {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        /// Service type id, see `service-types`
        #[arg(long)]
        service_type: i64,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        equipment: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// File to attach; may be repeated
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// Change a ticket's status
    Status {
        id: i64,
        status: TicketStatus,

        /// Technician notes recorded with the change
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a ticket
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List accounts
    List {
        #[arg(long)]
        role: Option<Role>,

        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        page: Option<u32>,
    },

    /// Create an account (administrators only)
    Create {
        username: String,

        /// Full display name
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "usuario")]
        role: Role,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        department: Option<String>,

        /// Mobile number with area code, 11 digits
        #[arg(long)]
        phone: Option<String>,

        /// Initial password; read from stdin when omitted
        #[arg(long, env = "CHAMADOS_NEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Change account fields (administrators only)
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        role: Option<Role>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Enable or disable the account
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete an account (administrators only)
    Delete { id: i64 },
}

impl Commands {
    /// Commands that run until interrupted are exempt from the global timeout
    pub const fn is_long_running(&self) -> bool {
        matches!(self, Self::Monitor)
    }

    pub async fn execute(self, config: CliConfig) -> Result<()> {
        let app = App::new(config)?;

        match self {
            Self::Login { username, password } => app.login(&username, password).await,
            Self::Logout => app.logout().await,
            Self::Whoami => app.whoami().await,
            Self::Profile { command } => command.execute(&app).await,
            Self::Tickets { command } => command.execute(&app).await,
            Self::Users { command } => command.execute(&app).await,
            Self::Stats => app.stats().await,
            Self::ServiceTypes => app.service_types().await,
            Self::Monitor => app.monitor().await,
        }
    }
}

impl ProfileCommands {
    async fn execute(self, app: &App) -> Result<()> {
        match self {
            Self::Update {
                email,
                name,
                department,
                phone: raw_phone,
            } => {
                let update = ProfileUpdate {
                    email,
                    display_name: name,
                    department,
                    phone: backend_phone(raw_phone)?,
                };
                if update.is_empty() {
                    bail!("nothing to update");
                }

                app.require_session()?;
                let profile = app.session.save_profile(&update).await?;
                println!("Profile updated");
                print_profile(&profile);
                Ok(())
            }
        }
    }
}

impl TicketCommands {
    async fn execute(self, app: &App) -> Result<()> {
        app.require_session()?;
        let tickets = app.tickets();

        match self {
            Self::List {
                mine,
                assigned,
                status,
                priority,
                search,
                days,
                page,
            } => {
                let filter = TicketFilter {
                    status,
                    priority,
                    search,
                    last_days: days,
                    page,
                    ..TicketFilter::default()
                };
                let page = if mine {
                    tickets.my_tickets(&filter).await?
                } else if assigned {
                    tickets.technician_tickets(&filter).await?
                } else {
                    tickets.list(&filter).await?
                };
                print_listing(&page);
                Ok(())
            }
            Self::Show { id } => {
                let chamado = tickets.get(id).await?;
                print_ticket(&chamado, &app.config.media_base());
                Ok(())
            }
            Self::Create {
                title,
                description,
                service_type,
                priority,
                equipment,
                location,
                attachments,
            } => {
                let uploads = attachments
                    .iter()
                    .map(|path| read_upload(path))
                    .collect::<Result<Vec<_>>>()?;
                let ticket = NewChamado {
                    title,
                    description,
                    service_type,
                    priority,
                    equipment,
                    location,
                };

                let creation = tickets.create_with_attachments(&ticket, &uploads).await?;
                println!(
                    "Created ticket {} (#{})",
                    creation.chamado.number, creation.chamado.id
                );
                for attachment in &creation.attachments {
                    println!(
                        "  attached {} ({})",
                        attachment.original_name,
                        files::format_file_size(attachment.size)
                    );
                }
                for failure in &creation.failures {
                    eprintln!("  {failure}");
                }
                if !creation.is_complete() {
                    bail!(
                        "{} of {} attachments could not be uploaded",
                        creation.failures.len(),
                        uploads.len()
                    );
                }
                Ok(())
            }
            Self::Status { id, status, notes } => {
                if let Some(user) = app.session.current_user() {
                    let current = tickets.get(id).await?;
                    let is_requester = current.requester.id == user.id;
                    if !status.can_be_set_by(user.role, is_requester) {
                        bail!("a {} cannot move ticket #{id} to '{status}'", user.role);
                    }
                }
                let updated = tickets
                    .update_status(
                        id,
                        &StatusChange {
                            status,
                            technician_notes: notes,
                        },
                    )
                    .await?;
                println!("Ticket {} is now {}", updated.number, updated.status);
                Ok(())
            }
            Self::Delete { id } => {
                tickets.delete(id).await?;
                println!("Deleted ticket #{id}");
                Ok(())
            }
        }
    }
}

impl UserCommands {
    async fn execute(self, app: &App) -> Result<()> {
        app.require_session()?;
        let users = UsuarioService::new(app.session.clone());

        match self {
            Self::List { role, search, page } => {
                let filter = UserFilter {
                    role,
                    search,
                    page,
                    ..UserFilter::default()
                };
                let listing = users.list(&filter).await?;
                for user in &listing.results {
                    println!(
                        "{:>5}  {:<16} {:<8} {}",
                        user.id, user.username, user.role, user.display_name
                    );
                }
                if listing.has_more() {
                    println!("... {} users in total, use --page for more", listing.count);
                }
                Ok(())
            }
            Self::Create {
                username,
                name,
                role,
                email,
                department,
                phone: raw_phone,
                password,
            } => {
                app.require_admin()?;
                let password = match password {
                    Some(password) => password,
                    None => read_password()?,
                };
                let new_user = NewUser {
                    email: email.unwrap_or_default(),
                    department,
                    phone: backend_phone(raw_phone)?,
                    ..NewUser::new(username, name, password, role)
                };
                new_user.validate()?;

                let created = users.create(&new_user).await?;
                println!("Created {} ({})", created.username, created.role);
                Ok(())
            }
            Self::Update {
                id,
                name,
                role,
                email,
                department,
                phone: raw_phone,
                active,
            } => {
                let update = UserUpdate {
                    email,
                    display_name: name,
                    role,
                    department,
                    phone: backend_phone(raw_phone)?,
                    active,
                };
                if update.is_empty() {
                    bail!("nothing to update");
                }
                app.require_admin()?;

                let profile = users.update(id, &update).await?;
                print_profile(&profile);
                Ok(())
            }
            Self::Delete { id } => {
                app.require_admin()?;
                users.delete(id).await?;
                println!("Deleted user #{id}");
                Ok(())
            }
        }
    }
}

/// Everything a command needs
struct App {
    config: CliConfig,
    session: Arc<SessionManager>,
}

impl App {
    fn new(config: CliConfig) -> Result<Self> {
        let mut builder = HelpdeskClient::builder().base_url(&config.api_url);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;
        let storage = Arc::new(FileStorage::new(config.session_file()));
        let session = Arc::new(SessionManager::new(client, storage));

        Ok(Self { config, session })
    }

    fn require_session(&self) -> Result<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            bail!("not logged in, run `chamados login <username>` first")
        }
    }

    /// Account administration is offered to administrators only
    fn require_admin(&self) -> Result<()> {
        match self.session.current_user() {
            Some(user) if user.role.is_admin() => Ok(()),
            Some(user) => bail!("{} accounts cannot manage users", user.role),
            None => bail!("no cached profile, run `chamados whoami` first"),
        }
    }

    fn tickets(&self) -> ChamadoService {
        ChamadoService::new(self.session.clone())
    }

    async fn login(&self, username: &str, password: Option<String>) -> Result<()> {
        let password = match password {
            Some(password) => password,
            None => read_password()?,
        };

        match self.session.login(username, &password).await {
            Ok(user) => {
                println!("Logged in as {} ({})", user.display_name, user.role);
                Ok(())
            }
            Err(ClientError::InvalidCredentials(msg)) => bail!("login rejected: {msg}"),
            Err(e) => Err(e.into()),
        }
    }

    async fn logout(&self) -> Result<()> {
        self.session.logout().await;
        println!("Logged out");
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        self.require_session()?;
        match self.session.bootstrap().await {
            Ok(Some(profile)) => {
                print_profile(&profile);
                Ok(())
            }
            Ok(None) => bail!("session expired, log in again"),
            Err(e) if e.is_network() => {
                warn!("Showing cached profile: {e}");
                let cached = self
                    .session
                    .current_user()
                    .context("backend unreachable and no cached profile")?;
                print_profile(&cached);
                println!("(cached, backend unreachable)");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stats(&self) -> Result<()> {
        self.require_session()?;
        let stats = self.tickets().statistics().await?;
        println!("Total:        {}", stats.total);
        println!("Open:         {}", stats.open);
        println!("In progress:  {}", stats.in_progress);
        println!("Closed:       {}", stats.closed);
        println!("Urgent:       {}", stats.urgent);
        println!("Mine:         {} ({} pending)", stats.mine, stats.mine_pending);
        Ok(())
    }

    async fn service_types(&self) -> Result<()> {
        self.require_session()?;
        for service_type in self.tickets().service_types().await? {
            if service_type.active {
                println!("{:>4}  {}", service_type.id, service_type.name);
            }
        }
        Ok(())
    }

    async fn monitor(&self) -> Result<()> {
        self.require_session()?;
        let mut events = self.session.subscribe_events();
        let handle = ExpiryMonitor::new(self.session.clone(), self.config.monitor.clone()).spawn();
        info!("Watching session, press Ctrl-C to stop");

        let outcome = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break Ok(()),
                event = events.recv() => match event {
                    Ok(SessionEvent::ExpiryWarning { remaining_secs }) => {
                        println!("Session expires in {}m{:02}s", remaining_secs / 60, remaining_secs % 60);
                    }
                    Ok(SessionEvent::TokenRefreshed) => println!("Session renewed"),
                    Ok(SessionEvent::LoggedOut { reason }) => {
                        println!("Session ended: {reason}");
                        break if reason.is_forced() {
                            Err(anyhow::anyhow!("logged out: {reason}"))
                        } else {
                            Ok(())
                        };
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed session events"),
                    Err(RecvError::Closed) => break Ok(()),
                },
            }
        };

        handle.shutdown().await;
        outcome
    }
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password is required");
    }
    Ok(password)
}

fn backend_phone(raw: Option<String>) -> Result<Option<String>> {
    match raw {
        Some(raw) if !phone::is_valid(&raw) => {
            bail!("phone must have 11 digits including the area code, got '{raw}'")
        }
        Some(raw) => Ok(Some(phone::for_backend(&raw))),
        None => Ok(None),
    }
}

fn read_upload(path: &Path) -> Result<AttachmentUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file", path.display()))?;
    Ok(AttachmentUpload::new(file_name, bytes))
}

fn print_profile(profile: &UserProfile) {
    println!("{} [{}]", profile.display_name, profile.initials());
    println!("  username:   {}", profile.username);
    println!("  role:       {}", profile.role);
    if !profile.email.is_empty() {
        println!("  email:      {}", profile.email);
    }
    if let Some(department) = &profile.department {
        println!("  department: {department}");
    }
    if let Some(number) = &profile.phone {
        println!("  phone:      {}", phone::display(number));
    }
}

fn print_listing(page: &Page<ChamadoSummary>) {
    if page.results.is_empty() {
        println!("No tickets");
        return;
    }
    for row in &page.results {
        println!(
            "{:<14} {:<15} {:<8} {}",
            row.number, row.status, row.priority, row.title
        );
    }
    if page.has_more() {
        println!("... {} tickets in total, use --page for more", page.count);
    }
}

fn print_ticket(chamado: &Chamado, media_base: &str) {
    println!("{} {}", chamado.number, chamado.title);
    println!("  status:      {}", chamado.status);
    println!("  priority:    {}", chamado.priority);
    println!("  service:     {}", chamado.service_type.name);
    println!("  requester:   {}", chamado.requester.display_name);
    if let Some(technician) = &chamado.technician {
        println!("  technician:  {}", technician.display_name);
    }
    if let Some(location) = &chamado.location {
        println!("  location:    {location}");
    }
    if let Some(equipment) = &chamado.equipment {
        println!("  equipment:   {equipment}");
    }
    println!("  opened:      {}", chamado.created_at.format("%d/%m/%Y %H:%M"));
    println!();
    println!("{}", chamado.description);

    if let Some(notes) = &chamado.technician_notes {
        println!();
        println!("Technician notes: {notes}");
    }

    if !chamado.attachments.is_empty() {
        println!();
        println!("Attachments:");
        for attachment in &chamado.attachments {
            let kind = if files::is_image_mime(&attachment.mime_type)
                || files::is_image_extension(&attachment.original_name)
            {
                "image"
            } else {
                "file"
            };
            println!(
                "  [{kind}] {} ({}) {}",
                attachment.original_name,
                files::format_file_size(attachment.size),
                files::build_file_url(media_base, &attachment.file_url)
            );
        }
    }

    if !chamado.history.is_empty() {
        println!();
        println!("History:");
        for entry in &chamado.history {
            let who = entry
                .user
                .as_ref()
                .map_or("system", |user| user.display_name.as_str());
            println!(
                "  {} {who}: {}",
                entry.created_at.format("%d/%m/%Y %H:%M"),
                entry.description
            );
        }
    }
}
