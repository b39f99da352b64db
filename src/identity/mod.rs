//! Identity endpoint contract.
//!
//! Three remote operations back the session lifecycle: authenticate,
//! refresh, and introspect. Implementations perform network calls only;
//! retry policy lives in the session manager.

mod claims;
mod http;

pub use claims::principal_from_token;
pub use http::HttpIdentityClient;

use serde::{Deserialize, Serialize};

/// Token material returned by both authenticate and refresh.
#[derive(Debug, Clone)]
pub struct TokenSet {
    /// Opaque bearer credential for authenticated requests
    pub access_token: String,
    /// Credential used solely to mint a new access token; servers that do
    /// not rotate refresh tokens omit it on refresh responses
    pub refresh_token: Option<String>,
    /// Declared access-token lifetime in seconds
    pub expires_in_secs: u64,
}

/// Resolved identity associated with a session.
///
/// The `role` is an opaque string at this layer; authorization decisions
/// belong to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    /// Account creation time (unix seconds), when the backend reports it
    #[serde(default)]
    pub created_at: Option<u64>,
}

/// Failure categories for identity endpoint calls.
///
/// The split matters to the caller: credential rejections are never retried,
/// a rejected refresh token skips the remaining retry budget, and only
/// transport-level failures count as transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Login rejected by the backend (wrong username/password)
    InvalidCredentials,
    /// Refresh token rejected as expired or revoked
    InvalidRefreshToken,
    /// Transport failure: connection refused, timeout, DNS
    Unreachable(String),
    /// Unexpected status or malformed response body
    Protocol(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::InvalidCredentials => write!(f, "Invalid credentials"),
            IdentityError::InvalidRefreshToken => write!(f, "Refresh token rejected"),
            IdentityError::Unreachable(reason) => {
                write!(f, "Identity backend unreachable: {}", reason)
            }
            IdentityError::Protocol(reason) => {
                write!(f, "Unexpected identity backend response: {}", reason)
            }
        }
    }
}

impl std::error::Error for IdentityError {}

/// Remote identity operations consumed by the session manager.
///
/// Implementations must be stateless with respect to sessions; the same
/// client is shared across all of them.
#[allow(async_fn_in_trait)]
pub trait IdentityClient: Send + Sync {
    /// Exchange credentials for a token set.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenSet, IdentityError>;

    /// Mint a new access token from a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IdentityError>;

    /// Resolve the principal behind an access token.
    async fn introspect(&self, access_token: &str) -> Result<Principal, IdentityError>;
}
