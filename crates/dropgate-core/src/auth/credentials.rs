use std::fmt;

use serde::{Deserialize, Serialize};

/// Cookie holding the short-lived access credential
pub const ACCESS_COOKIE: &str = "accessToken";

/// Cookie holding the long-lived refresh credential
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Access credential lifetime: 2 hours.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

/// Refresh credential lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// A bearer credential pair as issued by sign-in and refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl SessionCredentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Where the request client reads credentials from and writes rotations to.
///
/// Implementations use interior mutability so a single store can be shared
/// (via `Arc`) between the client and whoever builds the final response.
pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    /// Persist a newly issued pair (access: 2 hours, refresh: 7 days).
    fn store(&self, credentials: &SessionCredentials);

    /// Forget both credentials.
    fn clear(&self);
}

/// Which side of the wire a client runs on.
///
/// Only a browser-like context owns its credentials and may rotate them on
/// its own; server-side callers (the gatekeeper) drive refresh explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Server,
    Browser,
}

impl ExecutionContext {
    pub fn refreshes_on_unauthorized(self) -> bool {
        matches!(self, ExecutionContext::Browser)
    }
}
