//! Observable session state and the events consumers react to

use std::fmt;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    /// Still authenticated; a token refresh is in flight
    RefreshingToken,
}

impl SessionState {
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated | Self::RefreshingToken)
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogoutReason {
    UserRequested,
    NoRefreshToken,
    RefreshFailed,
    Expired,
    InvalidToken,
}

impl LogoutReason {
    /// Whether the user asked for it, as opposed to the session being torn down
    pub const fn is_forced(self) -> bool {
        !matches!(self, Self::UserRequested)
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UserRequested => "logged out",
            Self::NoRefreshToken => "session could not be renewed, no refresh token stored",
            Self::RefreshFailed => "session could not be renewed",
            Self::Expired => "session expired",
            Self::InvalidToken => "stored access token is invalid",
        };
        f.write_str(text)
    }
}

/// Notifications broadcast by the session manager.
///
/// A `LoggedOut` with a forced reason is the signal to send the user back to
/// the login entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: i64, username: String },
    LoggedOut { reason: LogoutReason },
    TokenRefreshed,
    ExpiryWarning { remaining_secs: i64 },
    ProfileUpdated,
}
