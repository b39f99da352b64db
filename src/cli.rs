//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use clap::Parser;
use tracing::error;
use url::Url;

use crate::config::{
    self, DEFAULT_BASE_RETRY_DELAY, DEFAULT_MAX_REFRESH_ATTEMPTS, DEFAULT_REFRESH_MARGIN_SECS,
    DEFAULT_SESSION_CAP_SECS, SessionConfig,
};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "gatekey",
    about = "Session lifecycle client for the platform identity service"
)]
pub struct Args {
    /// Identity service base URL
    #[arg(
        long,
        env = "GATEKEY_IDENTITY_URL",
        default_value = "http://localhost:8000"
    )]
    pub identity_url: String,

    /// Username to authenticate as
    #[arg(short, long)]
    pub username: String,

    /// Absolute session lifetime cap in seconds
    #[arg(long, default_value_t = DEFAULT_SESSION_CAP_SECS)]
    pub session_cap_secs: u64,

    /// Seconds before token expiry at which refresh becomes mandatory
    #[arg(long, default_value_t = DEFAULT_REFRESH_MARGIN_SECS)]
    pub refresh_margin_secs: u64,

    /// Base delay between refresh retries, in milliseconds
    #[arg(long, default_value_t = DEFAULT_BASE_RETRY_DELAY.as_millis() as u64)]
    pub base_delay_ms: u64,

    /// Refresh retry budget before grace-verification
    #[arg(long, default_value_t = DEFAULT_MAX_REFRESH_ATTEMPTS)]
    pub max_refresh_attempts: u32,

    /// Run against a synthetic demo session instead of the identity backend
    #[arg(long)]
    pub offline: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the password from the environment.
/// Returns None and logs an error if it is missing.
pub fn load_password(offline: bool) -> Option<String> {
    if let Ok(password) = std::env::var("GATEKEY_PASSWORD") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("GATEKEY_PASSWORD") };
        return Some(password);
    }

    if offline {
        // Offline mode accepts the reserved demo pair
        return Some(config::DEMO_PASSWORD.to_string());
    }

    error!("Password is required. Set the GATEKEY_PASSWORD environment variable");
    None
}

/// Parse and validate the identity service URL.
/// Returns None and logs an error if validation fails.
pub fn validate_identity_url(identity_url: &str) -> Option<Url> {
    let raw = match Url::parse(identity_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %identity_url, error = %e, "Invalid identity service URL");
            return None;
        }
    };

    let is_https = raw.scheme() == "https";
    let is_localhost = matches!(raw.host_str(), Some("localhost") | Some("127.0.0.1"));

    if !is_https && !is_localhost {
        error!("Identity service URL must use HTTPS for non-localhost deployments");
        return None;
    }

    // Endpoint paths are joined onto the base; without a trailing slash the
    // last path segment would be replaced instead of extended
    let mut normalized = raw.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    match Url::parse(&normalized) {
        Ok(url) => Some(url),
        Err(e) => {
            error!(url = %normalized, error = %e, "Invalid identity service URL");
            None
        }
    }
}

/// Build SessionConfig from validated arguments.
pub fn build_config(args: &Args) -> SessionConfig {
    SessionConfig {
        refresh_margin_secs: args.refresh_margin_secs,
        base_retry_delay: Duration::from_millis(args.base_delay_ms),
        max_refresh_attempts: args.max_refresh_attempts,
        session_cap_secs: args.session_cap_secs,
        offline: args.offline,
        ..SessionConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identity_url_accepts_https() {
        let url = validate_identity_url("https://id.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://id.example.com/api/");
    }

    #[test]
    fn test_validate_identity_url_accepts_localhost_http() {
        assert!(validate_identity_url("http://localhost:8000").is_some());
        assert!(validate_identity_url("http://127.0.0.1:8000").is_some());
    }

    #[test]
    fn test_validate_identity_url_rejects_remote_http() {
        assert!(validate_identity_url("http://id.example.com").is_none());
    }

    #[test]
    fn test_validate_identity_url_rejects_garbage() {
        assert!(validate_identity_url("not a url").is_none());
    }

    #[test]
    fn test_validate_identity_url_preserves_existing_slash() {
        let url = validate_identity_url("https://id.example.com/api/").unwrap();
        assert_eq!(url.as_str(), "https://id.example.com/api/");
    }

    #[test]
    fn test_build_config_carries_overrides() {
        let args = Args::parse_from([
            "gatekey",
            "--username",
            "alice",
            "--session-cap-secs",
            "60",
            "--max-refresh-attempts",
            "5",
            "--offline",
        ]);
        let config = build_config(&args);
        assert_eq!(config.session_cap_secs, 60);
        assert_eq!(config.max_refresh_attempts, 5);
        assert!(config.offline);
        // Untouched fields keep their defaults
        assert_eq!(config.proactive_fraction, 0.75);
    }
}
