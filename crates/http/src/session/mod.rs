//! Authenticated session lifecycle
//!
//! [`SessionManager`] owns the token pair and the cached user profile, and is
//! the only path authenticated requests take. A request answered with 401 is
//! recovered transparently: the refresh token is exchanged once (single
//! flight, see [`refresh`]) and the request is replayed with the new access
//! token. Callers only see the final outcome.

pub mod monitor;
mod refresh;
pub mod state;

use crate::client::auth::{PROFILE_PATH, PROFILE_UPDATE_PATH};
use crate::client::error::{ClientError, RefreshFailure};
use crate::client::{HelpdeskClient, check_response, decode_response};
use crate::storage::{SessionStorage, SessionStore};
use crate::types::LoginRequest;
use chamados_core::{ProfileUpdate, UserProfile};
use refresh::{Admission, RefreshGate, Settlement};
use reqwest::{Method, RequestBuilder, Response, StatusCode, header};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

pub use monitor::{ExpiryMonitor, MonitorAction, MonitorConfig, MonitorHandle};
pub use state::{LogoutReason, SessionEvent, SessionState};

const EVENT_CAPACITY: usize = 32;

/// Why a fresh token is being requested
#[derive(Clone, Copy)]
enum Trigger<'a> {
    /// A request carrying this token (or none) was answered with 401
    Rejected(Option<&'a str>),
    /// Explicit refresh, e.g. from the expiry monitor
    Explicit,
}

/// Owner of the authenticated session
pub struct SessionManager {
    client: HelpdeskClient,
    store: SessionStore,
    user: Mutex<Option<UserProfile>>,
    gate: RefreshGate,
    state_tx: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Create a manager, resuming whatever session the storage holds
    pub fn new(client: HelpdeskClient, storage: Arc<dyn SessionStorage>) -> Self {
        let store = SessionStore::new(storage);
        let stored = store.snapshot();

        let initial = if stored.access_token.is_some() || stored.refresh_token.is_some() {
            debug!("Resuming stored session");
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };
        let (state_tx, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            client,
            store,
            user: Mutex::new(stored.user),
            gate: RefreshGate::default(),
            state_tx,
            events,
        }
    }

    /// The underlying transport
    pub fn client(&self) -> &HelpdeskClient {
        &self.client
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to session notifications
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.store.refresh_token().is_some()
    }

    /// Whether a token refresh is currently outstanding
    pub fn is_refreshing(&self) -> bool {
        self.gate.is_in_flight()
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(?previous, current = ?state, "Session state changed");
        }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_cached_user(&self, user: Option<UserProfile>) {
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = user;
    }

    /// Authenticate with username and password. Single attempt, no retry.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        // A new login always starts a new epoch, whatever came before
        self.gate.reset();
        self.set_state(SessionState::Authenticating);

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = match self.client.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%username, "Login failed: {e}");
                self.discard_local_state();
                return Err(e);
            }
        };

        if let Err(e) = self
            .store
            .save_login(&response.access, &response.refresh, &response.user)
        {
            warn!("Could not persist session: {e}");
            self.discard_local_state();
            return Err(e);
        }

        let user = response.user;
        info!(user_id = user.id, username = %user.username, role = %user.role, "Logged in");
        self.set_cached_user(Some(user.clone()));
        self.set_state(SessionState::Authenticated);
        self.emit(SessionEvent::LoggedIn {
            user_id: user.id,
            username: user.username.clone(),
        });
        Ok(user)
    }

    /// Log out. The backend is told on a best-effort basis; local state is
    /// always cleared. Calling this on a logged-out session does nothing.
    pub async fn logout(&self) {
        let stored = self.store.snapshot();
        if self.state() == SessionState::Anonymous && stored.is_empty() {
            debug!("Logout requested with no session, nothing to do");
            return;
        }

        if let Err(e) = self.client.logout(stored.access_token.as_deref()).await {
            // 401 here is expected once the access token has lapsed
            debug!("Ignoring logout failure: {e}");
        }

        self.end_session(LogoutReason::UserRequested);
    }

    /// Tear the session down locally without asking the backend.
    ///
    /// Idempotent; a second call on an anonymous session is a no-op.
    pub fn force_logout(&self, reason: LogoutReason) {
        if self.state() == SessionState::Anonymous && self.store.snapshot().is_empty() {
            return;
        }
        warn!(%reason, "Forcing logout");
        self.end_session(reason);
    }

    fn end_session(&self, reason: LogoutReason) {
        self.discard_local_state();
        info!(%reason, "Session ended");
        self.emit(SessionEvent::LoggedOut { reason });
    }

    /// Drop the stored credentials while the gate is still held
    fn discard_tokens(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored session: {e}");
        }
    }

    /// Clear tokens, profile, and refresh bookkeeping
    fn discard_local_state(&self) {
        self.gate.reset();
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored session: {e}");
        }
        self.set_cached_user(None);
        self.set_state(SessionState::Anonymous);
    }

    /// Validate a resumed session at start-up.
    ///
    /// Returns the fresh profile, or `None` when there is no session to
    /// resume. Rejected sessions are cleared; transport and server errors
    /// leave the stored session in place and are returned.
    pub async fn bootstrap(&self) -> Result<Option<UserProfile>, ClientError> {
        let stored = self.store.snapshot();
        if stored.access_token.is_none() && stored.refresh_token.is_none() {
            if stored.user.is_some() {
                debug!("Dropping stored profile without tokens");
                self.discard_local_state();
            }
            return Ok(None);
        }

        if stored.user.is_some() {
            self.set_cached_user(stored.user);
        }
        self.set_state(SessionState::Authenticated);

        match self.get_profile().await {
            Ok(profile) => Ok(Some(profile)),
            Err(e) if e.is_network() || matches!(e, ClientError::ServerError { .. }) => {
                warn!("Could not validate stored session: {e}");
                Err(e)
            }
            Err(e) => {
                warn!("Stored session rejected: {e}");
                self.force_logout(LogoutReason::InvalidToken);
                Ok(None)
            }
        }
    }

    /// Fetch the current user's profile and cache it
    pub async fn get_profile(&self) -> Result<UserProfile, ClientError> {
        let profile: UserProfile = self
            .execute(|client| client.request(Method::GET, PROFILE_PATH))
            .await?;
        self.update_profile(profile.clone())?;
        Ok(profile)
    }

    /// Replace the cached profile, e.g. after the profile form was saved
    pub fn update_profile(&self, profile: UserProfile) -> Result<(), ClientError> {
        if !self.is_authenticated() {
            return Err(ClientError::SessionEnded);
        }
        self.store.save_user(&profile)?;
        self.set_cached_user(Some(profile));
        self.emit(SessionEvent::ProfileUpdated);
        Ok(())
    }

    /// Send a partial profile update and cache the result
    pub async fn save_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ClientError> {
        let profile: UserProfile = self
            .execute(|client| client.request(Method::PUT, PROFILE_UPDATE_PATH).json(update))
            .await?;
        self.update_profile(profile.clone())?;
        Ok(profile)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Joins a refresh already in flight instead of starting a second one.
    /// Failure ends the session.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        self.fresh_token(Trigger::Explicit).await
    }

    async fn fresh_token(&self, trigger: Trigger<'_>) -> Result<String, ClientError> {
        if self.store.refresh_token().is_none() {
            self.force_logout(LogoutReason::NoRefreshToken);
            return Err(ClientError::NoRefreshToken);
        }

        let admission = self.gate.admit(|| match trigger {
            Trigger::Rejected(used) => self
                .store
                .access_token()
                .filter(|current| Some(current.as_str()) != used),
            Trigger::Explicit => None,
        });

        match admission {
            Admission::Reuse(token) => {
                debug!("Access token already replaced, replaying with it");
                Ok(token)
            }
            Admission::Wait(rx) => match rx.await {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(failure)) => Err(failure.into()),
                Err(_) => Err(ClientError::SessionEnded),
            },
            Admission::Drive(ticket) => {
                ticket.while_current(|| {
                    self.state_tx.send_if_modified(|state| {
                        let refreshing = *state == SessionState::Authenticated;
                        if refreshing {
                            *state = SessionState::RefreshingToken;
                        }
                        refreshing
                    });
                });

                let Some(refresh_token) = self.store.refresh_token() else {
                    ticket.fail(RefreshFailure::NoRefreshToken, || self.discard_tokens());
                    self.force_logout(LogoutReason::NoRefreshToken);
                    return Err(ClientError::NoRefreshToken);
                };

                debug!("Refreshing access token");
                match self.client.refresh_access(&refresh_token).await {
                    Ok(response) => {
                        let rotated = response.refresh;
                        // Stored token, state, and event change together under the
                        // gate lock; a logout either precedes all of them or follows
                        let settlement = ticket.succeed(response.access.clone(), |token| {
                            if let Err(e) = self.store.save_access_token(token, rotated.as_deref())
                            {
                                warn!("Failed to persist refreshed token: {e}");
                            }
                            self.set_state(SessionState::Authenticated);
                            self.emit(SessionEvent::TokenRefreshed);
                        });
                        match settlement {
                            Settlement::Settled { released } => {
                                info!(released, "Access token refreshed");
                                Ok(response.access)
                            }
                            Settlement::Stale => {
                                debug!("Discarding token refreshed for an ended session");
                                Err(ClientError::SessionEnded)
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Token refresh failed: {e}");
                        let settlement =
                            ticket.fail(RefreshFailure::from(&e), || self.discard_tokens());
                        if settlement != Settlement::Stale {
                            self.force_logout(LogoutReason::RefreshFailed);
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    async fn dispatch<F>(&self, build: &F, token: Option<&str>) -> Result<Response, ClientError>
    where
        F: Fn(&HelpdeskClient) -> RequestBuilder,
    {
        let mut request = build(&self.client);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(request.send().await?)
    }

    /// Send an authenticated request, recovering once from an expired token.
    ///
    /// `build` is called again for the replay, so bodies that cannot be
    /// cloned (multipart uploads) are rebuilt rather than copied. Non-401
    /// responses are returned as-is; a 401 on the replay is returned too.
    pub async fn send<F>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&HelpdeskClient) -> RequestBuilder,
    {
        let token = self.store.access_token();
        let response = self.dispatch(&build, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(url = %response.url(), "Request unauthorized, recovering session");
        let fresh = self
            .fresh_token(Trigger::Rejected(token.as_deref()))
            .await?;

        let replay = self.dispatch(&build, Some(&fresh)).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!(url = %replay.url(), "Request still unauthorized after token refresh");
        }
        Ok(replay)
    }

    /// [`send`](Self::send) and decode a JSON body
    pub async fn execute<T, F>(&self, build: F) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned,
        F: Fn(&HelpdeskClient) -> RequestBuilder,
    {
        decode_response(self.send(build).await?).await
    }

    /// [`send`](Self::send) for endpoints without a response body
    pub async fn execute_empty<F>(&self, build: F) -> Result<(), ClientError>
    where
        F: Fn(&HelpdeskClient) -> RequestBuilder,
    {
        check_response(self.send(build).await?).await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.client.base_url())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
