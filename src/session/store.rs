//! The session record and its expiry math.
//!
//! One mutable record per logical session, owned exclusively by the
//! manager. "No session" is `None`; clearing replaces the whole `Option`
//! atomically, so partially-populated records cannot exist.

use crate::identity::{Principal, TokenSet};

/// A bearer-token-backed session.
///
/// All timestamps are unix seconds.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque bearer credential attached to authenticated requests
    pub access_token: String,
    /// Credential used solely to mint new access tokens; absent in
    /// offline mode
    pub refresh_token: Option<String>,
    /// When the current access token was minted
    pub issued_at: u64,
    /// Server-declared expiry of the access token
    pub access_expires_at: u64,
    /// When the session was first established; never mutated by refresh
    pub session_started_at: u64,
    /// Consecutive failed refresh attempts since the last success
    pub refresh_attempts: u32,
    /// Cached identity; may be degraded if introspection failed
    pub principal: Option<Principal>,
}

impl Session {
    /// Build a fresh session from a login token set.
    ///
    /// Returns `None` for a zero-lifetime token set: a record whose expiry
    /// does not exceed its issue time is invalid by construction.
    pub fn establish(tokens: &TokenSet, now: u64) -> Option<Self> {
        if tokens.expires_in_secs == 0 {
            return None;
        }
        Some(Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            issued_at: now,
            access_expires_at: now + tokens.expires_in_secs,
            session_started_at: now,
            refresh_attempts: 0,
            principal: None,
        })
    }

    /// Apply a successful refresh in place.
    ///
    /// Keeps the old refresh token when the server does not rotate it, and
    /// leaves `session_started_at` untouched. Returns `false` (without
    /// mutating) for a zero-lifetime token set.
    pub fn apply_refresh(&mut self, tokens: &TokenSet, now: u64) -> bool {
        if tokens.expires_in_secs == 0 {
            return false;
        }
        self.access_token = tokens.access_token.clone();
        if let Some(rotated) = &tokens.refresh_token {
            self.refresh_token = Some(rotated.clone());
        }
        self.issued_at = now;
        self.access_expires_at = now + tokens.expires_in_secs;
        self.refresh_attempts = 0;
        true
    }

    /// Declared lifetime of the current access token in seconds.
    pub fn lifetime_secs(&self) -> u64 {
        self.access_expires_at.saturating_sub(self.issued_at)
    }

    /// Fraction of the token lifetime elapsed at `now`, clamped to [0, 1].
    pub fn fraction_elapsed(&self, now: u64) -> f64 {
        let lifetime = self.lifetime_secs();
        if lifetime == 0 {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.issued_at);
        (elapsed as f64 / lifetime as f64).min(1.0)
    }

    /// Whether `now` is within `margin_secs` of the access-token expiry
    /// (or past it).
    pub fn within_refresh_margin(&self, now: u64, margin_secs: u64) -> bool {
        now + margin_secs >= self.access_expires_at
    }

    /// Session age in seconds, measured from the original login.
    pub fn age_secs(&self, now: u64) -> u64 {
        now.saturating_sub(self.session_started_at)
    }
}
