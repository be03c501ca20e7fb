//! Gate decision types and the internal deny reasons behind them.

use crate::services::identity::{CookieMutation, Session};

/// Result of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Pass the request through unchanged.
    Allow,
    /// `401` with `WWW-Authenticate: Basic realm="<realm>"`.
    Challenge { realm: String },
    /// `302` to the login surface (`location` already carries `next`).
    Redirect { location: String },
}

/// Decision plus the cookie writes the identity provider asked for.
///
/// The HTTP layer applies `cookies` whatever the decision is. `session` is
/// only set on an allowed request in session mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub decision: GateDecision,
    pub cookies: Vec<CookieMutation>,
    pub session: Option<Session>,
}

impl GateOutcome {
    pub fn allow() -> Self {
        Self::from(GateDecision::Allow)
    }
}

impl From<GateDecision> for GateOutcome {
    fn from(decision: GateDecision) -> Self {
        Self {
            decision,
            cookies: Vec::new(),
            session: None,
        }
    }
}

/// Why a protected request was denied.
///
/// Only used for logging; every reason maps to the same response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("gate credentials are not configured")]
    ConfigurationMissing,
    #[error("no credential presented")]
    CredentialAbsent,
    #[error("malformed credential")]
    CredentialMalformed,
    #[error("invalid credential")]
    CredentialInvalid,
    #[error("identity provider call failed")]
    VerificationCallFailed,
}

impl DenyReason {
    /// Expected, high-frequency reasons are logged at debug only.
    pub fn is_noisy(&self) -> bool {
        matches!(
            self,
            Self::CredentialAbsent | Self::CredentialMalformed | Self::ConfigurationMissing
        )
    }
}
