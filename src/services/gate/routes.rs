//! Path classification for the access gate.
//!
//! Public exceptions are exact paths and are checked first, so a public
//! endpoint nested under a protected prefix stays reachable. They match the
//! raw request path byte for byte, the same string the router dispatches on,
//! so aliases like `/platform/LOGIN` or `/platform/login/` are not public.
//!
//! Protected entries are plain string prefixes (`/platform` also covers
//! `/platformx`) checked against both the raw path and its normalized form.
//! The raw check covers what the router will match (`/platform/x/../../health`
//! still routes under `/platform`); the normalized check covers encodings and
//! case variants. Either match protects the request.

use percent_encoding::percent_decode_str;

use crate::config::GateMode;

/// Prefixes that require a credential in every gate mode.
pub const PROTECTED_PREFIXES: &[&str] = &[
    "/platform",
    "/api/ask",
    "/api/send",
    "/api/inbox",
    "/api/leads",
    "/api/overview",
    "/api/tasks",
    "/api/followups",
];

pub const CONTACT_PATH: &str = "/api/contact";
pub const SESSION_BRIDGE_PATH: &str = "/api/auth/session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Explicit public exception; never verified.
    Public,
    /// Matches a protected prefix; must present a credential.
    Protected,
    /// Not listed anywhere; passes through.
    Unclassified,
}

#[derive(Debug, Clone)]
pub struct RouteRules {
    public: Vec<String>,
    protected: Vec<String>,
}

impl RouteRules {
    pub fn new<P, Q>(public: P, protected: Q) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        Self {
            public: public
                .into_iter()
                .map(|p| p.as_ref().to_string())
                .collect(),
            protected: protected
                .into_iter()
                .map(|p| normalize_path(p.as_ref()))
                .collect(),
        }
    }

    /// Rule set for the given gate mode.
    ///
    /// Session mode additionally exempts the login page and the session
    /// bridge (otherwise nobody could ever sign in) and protects the rest of
    /// `/api/auth`.
    pub fn for_mode(mode: GateMode, login_path: &str) -> Self {
        match mode {
            GateMode::Basic => Self::new([CONTACT_PATH], PROTECTED_PREFIXES.iter().copied()),
            GateMode::Session => Self::new(
                [CONTACT_PATH, login_path, SESSION_BRIDGE_PATH],
                PROTECTED_PREFIXES.iter().copied().chain(["/api/auth"]),
            ),
        }
    }

    pub fn classify(&self, raw_path: &str) -> PathClass {
        if self.public.iter().any(|p| p == raw_path) {
            return PathClass::Public;
        }

        let normalized = normalize_path(raw_path);
        if self.is_protected(raw_path) || self.is_protected(&normalized) {
            return PathClass::Protected;
        }

        PathClass::Unclassified
    }

    fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Canonical form used for the protected-prefix check only.
///
/// - percent-decoded (`/%70latform` is `/platform`)
/// - repeated slashes collapsed, `.` dropped, `..` resolved
/// - no trailing slash, ASCII-lowercased
pub fn normalize_path(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(decoded.len() + 1);
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }

    out.make_ascii_lowercase();
    out
}
