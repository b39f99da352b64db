//! Session manager configuration.
//!
//! Values are resolved once at startup (see `cli::build_config`) and are
//! immutable afterwards. The defaults mirror the identity platform's
//! production constants.

use std::time::Duration;

/// Fraction of the access-token lifetime after which refresh is attempted
/// proactively, before the hard expiry margin is reached.
pub const DEFAULT_PROACTIVE_FRACTION: f64 = 0.75;

/// Hard margin before expiry: inside this window a refresh is always due.
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 30;

/// Base delay for the first refresh retry.
pub const DEFAULT_BASE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Consecutive failed refresh attempts tolerated before grace-verification.
pub const DEFAULT_MAX_REFRESH_ATTEMPTS: u32 = 3;

/// Extra lifetime granted when grace-verification of a stale token succeeds.
pub const DEFAULT_GRACE_WINDOW_SECS: u64 = 5 * 60;

/// Absolute session lifetime cap, independent of token refreshes: 8 hours.
pub const DEFAULT_SESSION_CAP_SECS: u64 = 8 * 60 * 60;

/// Per-request timeout for identity endpoint calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reserved credential pair accepted in offline mode.
pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo";

/// Tunables for the session lifecycle manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fraction of token lifetime elapsed before proactive refresh (0..1)
    pub proactive_fraction: f64,
    /// Seconds before expiry at which refresh becomes mandatory
    pub refresh_margin_secs: u64,
    /// Base delay for exponential refresh backoff
    pub base_retry_delay: Duration,
    /// Refresh retry budget before falling back to grace-verification
    pub max_refresh_attempts: u32,
    /// Seconds of extra validity granted by a successful grace-verification
    pub grace_window_secs: u64,
    /// Hard ceiling on session age, regardless of token freshness
    pub session_cap_secs: u64,
    /// Timeout applied to each identity endpoint request
    pub request_timeout: Duration,
    /// Substitute a static synthetic session for all backend calls
    pub offline: bool,
    /// Username accepted by offline-mode login
    pub demo_username: String,
    /// Password accepted by offline-mode login
    pub demo_password: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            proactive_fraction: DEFAULT_PROACTIVE_FRACTION,
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
            base_retry_delay: DEFAULT_BASE_RETRY_DELAY,
            max_refresh_attempts: DEFAULT_MAX_REFRESH_ATTEMPTS,
            grace_window_secs: DEFAULT_GRACE_WINDOW_SECS,
            session_cap_secs: DEFAULT_SESSION_CAP_SECS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            offline: false,
            demo_username: DEMO_USERNAME.to_string(),
            demo_password: DEMO_PASSWORD.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_platform_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.proactive_fraction, 0.75);
        assert_eq!(config.grace_window_secs, 300);
        assert_eq!(config.max_refresh_attempts, 3);
        assert!(!config.offline);
    }
}
