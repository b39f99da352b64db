//! HTTP adapter for the remote identity service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::{IdentityClient, IdentityError, Principal, TokenSet};

const LOGIN_PATH: &str = "auth/login";
const REFRESH_PATH: &str = "auth/refresh";
const VERIFY_PATH: &str = "auth/verify";

/// Identity client backed by the platform's HTTP identity endpoints.
///
/// Stateless and safe to share across sessions. Each request carries its own
/// timeout; retry policy belongs to the session manager.
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    base_url: Url,
    http: reqwest::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Wire shape of both login and refresh responses.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: u64,
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        TokenSet {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in_secs: response.expires_in,
        }
    }
}

impl HttpIdentityClient {
    /// Create a client against the given identity service base URL.
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.base_url
            .join(path)
            .map_err(|e| IdentityError::Protocol(format!("invalid endpoint URL: {}", e)))
    }

    fn transport_error(e: reqwest::Error) -> IdentityError {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            IdentityError::Unreachable(e.to_string())
        } else {
            IdentityError::Protocol(e.to_string())
        }
    }

    async fn parse_tokens(response: reqwest::Response) -> Result<TokenSet, IdentityError> {
        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Protocol(format!("malformed token response: {}", e)))?;
        Ok(tokens.into())
    }
}

impl IdentityClient for HttpIdentityClient {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenSet, IdentityError> {
        let response = self
            .http
            .post(self.endpoint(LOGIN_PATH)?)
            .timeout(self.timeout)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(IdentityError::InvalidCredentials);
        }
        if status.is_server_error() {
            return Err(IdentityError::Unreachable(format!("login returned {}", status)));
        }
        if !status.is_success() {
            return Err(IdentityError::Protocol(format!("login returned {}", status)));
        }

        Self::parse_tokens(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IdentityError> {
        let response = self
            .http
            .post(self.endpoint(REFRESH_PATH)?)
            .timeout(self.timeout)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        // 401 and 403 mean the refresh token itself was rejected; retrying
        // it cannot succeed
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(IdentityError::InvalidRefreshToken);
        }
        if status.is_server_error() {
            return Err(IdentityError::Unreachable(format!(
                "refresh returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(IdentityError::Protocol(format!("refresh returned {}", status)));
        }

        Self::parse_tokens(response).await
    }

    async fn introspect(&self, access_token: &str) -> Result<Principal, IdentityError> {
        let response = self
            .http
            .get(self.endpoint(VERIFY_PATH)?)
            .timeout(self.timeout)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(IdentityError::Unreachable(format!(
                "verify returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(IdentityError::Protocol(format!("verify returned {}", status)));
        }

        response
            .json::<Principal>()
            .await
            .map_err(|e| IdentityError::Protocol(format!("malformed principal: {}", e)))
    }
}
