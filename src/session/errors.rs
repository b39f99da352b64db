//! Session error taxonomy.
//!
//! Only terminal outcomes surface to callers. Transient refresh failures are
//! absorbed by the manager's retry budget and never appear here.

/// Errors surfaced by session manager operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists; `login` is required
    NoSession,
    /// Login rejected by the backend; never retried automatically
    InvalidCredentials,
    /// Transport-level failure reaching the identity backend. Callers may
    /// choose to fall back to offline mode; the manager does not
    BackendUnavailable,
    /// Refresh and grace-verification both failed, or the absolute session
    /// cap was exceeded. The session has been cleared
    SessionExpired,
    /// A valid-looking token with no resolvable principal. The session has
    /// been cleared
    CorruptSession,
}

impl SessionError {
    /// Single unambiguous message per outcome. Expired and corrupt sessions
    /// both read as "log in again"; raw transport errors from intermediate
    /// retries are never resurfaced.
    pub fn message(&self) -> &'static str {
        match self {
            SessionError::NoSession => "Not logged in",
            SessionError::InvalidCredentials => "Invalid username or password",
            SessionError::BackendUnavailable => "Identity service unavailable",
            SessionError::SessionExpired => "Session expired, please log in again",
            SessionError::CorruptSession => "Session invalid, please log in again",
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for SessionError {}
