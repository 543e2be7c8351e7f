//! Background watch over access-token expiry
//!
//! Every tick the monitor reads the stored access token's `exp` claim and
//! decides whether to warn, refresh ahead of time, or end the session.

use super::{LogoutReason, SessionEvent, SessionManager};
use crate::client::error::ClientError;
use crate::token::{seconds_until_expiry, unix_now};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Expiry monitor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between checks
    pub poll_interval_secs: u64,
    /// Warn once when fewer than this many seconds remain
    pub warning_threshold_secs: i64,
    /// Refresh ahead of expiry when fewer than this many seconds remain
    pub refresh_lead_secs: i64,
    pub proactive_refresh: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            warning_threshold_secs: 5 * 60,
            refresh_lead_secs: 30,
            proactive_refresh: true,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// What a single check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorAction {
    /// No access token stored
    Idle,
    Healthy { remaining_secs: i64 },
    Warned { remaining_secs: i64 },
    Refreshed,
    ForcedLogout(LogoutReason),
}

/// Periodic access-token expiry check for one session
pub struct ExpiryMonitor {
    session: Arc<SessionManager>,
    config: MonitorConfig,
    /// Token the expiry warning was last issued for
    warned_for: Mutex<Option<String>>,
}

impl ExpiryMonitor {
    pub fn new(session: Arc<SessionManager>, config: MonitorConfig) -> Self {
        Self {
            session,
            config,
            warned_for: Mutex::new(None),
        }
    }

    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Evaluate the session once, as of the unix time `now`
    pub async fn check(&self, now: i64) -> MonitorAction {
        let Some(token) = self.session.access_token() else {
            self.clear_warning();
            return MonitorAction::Idle;
        };

        let remaining = match seconds_until_expiry(&token, now) {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!("Stored access token cannot be decoded: {e}");
                self.clear_warning();
                self.session.force_logout(LogoutReason::InvalidToken);
                return MonitorAction::ForcedLogout(LogoutReason::InvalidToken);
            }
        };

        if remaining <= 0 {
            self.clear_warning();
            self.session.force_logout(LogoutReason::Expired);
            return MonitorAction::ForcedLogout(LogoutReason::Expired);
        }

        if self.config.proactive_refresh
            && remaining <= self.config.refresh_lead_secs
            && self.session.has_refresh_token()
        {
            debug!(remaining, "Access token about to expire, refreshing ahead");
            return match self.session.refresh().await {
                Ok(_) => MonitorAction::Refreshed,
                Err(e) => {
                    warn!("Proactive refresh failed: {e}");
                    if self.session.is_authenticated() {
                        // Abandoned refresh; the session is still usable
                        MonitorAction::Healthy {
                            remaining_secs: remaining,
                        }
                    } else if matches!(e, ClientError::SessionEnded) {
                        // Logged out elsewhere while the refresh ran
                        self.clear_warning();
                        MonitorAction::Idle
                    } else {
                        self.clear_warning();
                        MonitorAction::ForcedLogout(LogoutReason::RefreshFailed)
                    }
                }
            };
        }

        if remaining <= self.config.warning_threshold_secs {
            let mut warned_for = self.warned_for.lock().unwrap_or_else(PoisonError::into_inner);
            if warned_for.as_deref() != Some(token.as_str()) {
                *warned_for = Some(token);
                drop(warned_for);
                info!(remaining, "Session expires soon");
                self.session.emit(SessionEvent::ExpiryWarning {
                    remaining_secs: remaining,
                });
                return MonitorAction::Warned {
                    remaining_secs: remaining,
                };
            }
        }

        MonitorAction::Healthy {
            remaining_secs: remaining,
        }
    }

    fn clear_warning(&self) {
        *self.warned_for.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Run the check on an interval until the returned handle is shut down
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.config.poll_interval();

        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(?period, "Expiry monitor started");

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let action = self.check(unix_now()).await;
                        debug!(?action, "Expiry check");
                    }
                }
            }

            debug!("Expiry monitor stopped");
        });

        MonitorHandle { shutdown_tx, task }
    }
}

/// Handle to a running [`ExpiryMonitor`]
pub struct MonitorHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the monitor and wait for its task to finish
    pub async fn shutdown(self) {
        self.shutdown_tx.send(true).ok();
        if let Err(e) = self.task.await {
            warn!("Expiry monitor task ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
