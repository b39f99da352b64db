//! Read-side classification of session state.

use super::store::Session;
use crate::config::SessionConfig;

/// Where a session sits in its lifecycle, as observable between manager
/// operations.
///
/// `Refreshing` and `GraceVerifying` are transient while a call is in
/// flight; between calls they mean "that step is due on the next
/// `ensure_valid`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Unauthenticated; login required
    NoSession,
    /// Token fresh; no network activity needed
    Valid,
    /// Proactive-refresh threshold crossed; renewal due soon
    NearExpiry,
    /// Inside the hard refresh margin (or past expiry); refresh due now
    Refreshing,
    /// Refresh budget exhausted; one introspection of the stale token left
    GraceVerifying,
    /// Terminal; the session has been (or will be) cleared
    Expired,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::NoSession => "no-session",
            SessionPhase::Valid => "valid",
            SessionPhase::NearExpiry => "near-expiry",
            SessionPhase::Refreshing => "refreshing",
            SessionPhase::GraceVerifying => "grace-verifying",
            SessionPhase::Expired => "expired",
        }
    }
}

/// Classify a session slot at time `now`.
pub fn classify(session: Option<&Session>, config: &SessionConfig, now: u64) -> SessionPhase {
    let Some(session) = session else {
        return SessionPhase::NoSession;
    };

    if session.age_secs(now) > config.session_cap_secs {
        return SessionPhase::Expired;
    }

    if session.within_refresh_margin(now, config.refresh_margin_secs) {
        if session.refresh_attempts >= config.max_refresh_attempts {
            return SessionPhase::GraceVerifying;
        }
        return SessionPhase::Refreshing;
    }

    if session.fraction_elapsed(now) >= config.proactive_fraction {
        return SessionPhase::NearExpiry;
    }

    SessionPhase::Valid
}
