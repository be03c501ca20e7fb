//! Identity provider interface used by the session gate and the session bridge.
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::services::identity::cookies::{CookieMutation, RequestCookies};

/// A session the provider vouched for on this request.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    // unix seconds
    pub expires_at: i64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print tokens
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session lookup result.
///
/// `cookies` must be written to the response whether or not `session` is
/// present (token refresh, clearing a corrupt cookie, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLookup {
    pub session: Option<Session>,
    pub cookies: Vec<CookieMutation>,
}

impl SessionLookup {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Identity-provider failures.
///
/// Note:
/// - The gate treats every variant as "no valid session"; the distinction
///   only exists for logs and for the session bridge's status code.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider transport error: {0}")]
    Transport(String),
    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("identity provider returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    // Provider name (for logging).
    fn name(&self) -> &'static str;

    // Read and verify the session carried by the request cookies.
    //
    // Returns:
    // - Ok(lookup with session) => valid session (possibly refreshed)
    // - Ok(lookup without session) => no session cookie / unusable cookie
    // - Err(_) => provider failure (caller must treat as unauthenticated)
    async fn read_session(&self, cookies: &RequestCookies) -> Result<SessionLookup, IdentityError>;

    // Verify tokens obtained client-side and turn them into session cookies.
    async fn establish_session(
        &self,
        cookies: &RequestCookies,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<SessionLookup, IdentityError>;
}
