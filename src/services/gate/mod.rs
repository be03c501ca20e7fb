//! Access gate: classify the request path, verify the credential for
//! protected paths, and produce a single decision.
//!
//! This module does not know about axum middleware; `middleware::gate` calls
//! `Gate::evaluate` and turns the outcome into a response.

pub mod basic;
pub mod decision;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::http::{HeaderMap, Uri, header};

use crate::config::{Config, GateMode};
use crate::services::identity::IdentityProvider;

pub use basic::BasicVerifier;
pub use decision::{DenyReason, GateDecision, GateOutcome};
pub use routes::{PathClass, RouteRules};
pub use session::SessionVerifier;

#[derive(Debug, Clone)]
pub enum Verifier {
    Basic(BasicVerifier),
    Session(SessionVerifier),
}

#[derive(Debug, Clone)]
pub struct Gate {
    rules: RouteRules,
    verifier: Verifier,
}

impl Gate {
    pub fn new(rules: RouteRules, verifier: Verifier) -> Self {
        Self { rules, verifier }
    }

    /// Build the gate for the configured mode. `provider` is only used in
    /// session mode.
    pub fn from_config(config: &Config, provider: Option<Arc<dyn IdentityProvider>>) -> Self {
        let rules = RouteRules::for_mode(config.gate_mode, &config.login_path);
        let verifier = match config.gate_mode {
            GateMode::Basic => Verifier::Basic(BasicVerifier::new(&config.basic_auth)),
            GateMode::Session => {
                Verifier::Session(SessionVerifier::new(config.login_path.clone(), provider))
            }
        };
        Self::new(rules, verifier)
    }

    pub fn mode(&self) -> GateMode {
        match self.verifier {
            Verifier::Basic(_) => GateMode::Basic,
            Verifier::Session(_) => GateMode::Session,
        }
    }

    /// False when protected routes can never be reached (fail closed).
    pub fn is_configured(&self) -> bool {
        match &self.verifier {
            Verifier::Basic(v) => v.is_configured(),
            Verifier::Session(v) => v.is_configured(),
        }
    }

    pub async fn evaluate(&self, uri: &Uri, headers: &HeaderMap) -> GateOutcome {
        match self.rules.classify(uri.path()) {
            PathClass::Public | PathClass::Unclassified => return GateOutcome::allow(),
            PathClass::Protected => {}
        }

        match &self.verifier {
            Verifier::Basic(verifier) => {
                let authorization = headers
                    .get(header::AUTHORIZATION)
                    .map(|v| v.to_str().unwrap_or_default());

                match verifier.verify(authorization) {
                    Ok(()) => GateOutcome::allow(),
                    Err(reason) => {
                        log_deny(uri, reason);
                        GateDecision::Challenge {
                            realm: verifier.realm().to_string(),
                        }
                        .into()
                    }
                }
            }
            Verifier::Session(verifier) => {
                let check = verifier.verify(headers).await;
                match check.result {
                    Ok(session) => GateOutcome {
                        decision: GateDecision::Allow,
                        cookies: check.cookies,
                        session: Some(session),
                    },
                    Err(reason) => {
                        log_deny(uri, reason);
                        GateOutcome {
                            decision: GateDecision::Redirect {
                                location: verifier.login_redirect(uri.path(), uri.query()),
                            },
                            cookies: check.cookies,
                            session: None,
                        }
                    }
                }
            }
        }
    }
}

fn log_deny(uri: &Uri, reason: DenyReason) {
    if reason.is_noisy() {
        tracing::debug!(path = %uri.path(), %reason, "gate denied request");
    } else {
        tracing::warn!(path = %uri.path(), %reason, "gate denied request");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BasicAuthConfig;
    use crate::services::identity::{
        CookieMutation, IdentityError, RequestCookies, Session, SessionLookup,
    };
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use base64::Engine as _;
    use uuid::Uuid;

    fn basic_gate(user: Option<&str>, pass: Option<&str>) -> Gate {
        Gate::new(
            RouteRules::for_mode(GateMode::Basic, "/platform/login"),
            Verifier::Basic(BasicVerifier::new(&BasicAuthConfig {
                user: user.map(str::to_string),
                pass: pass.map(str::to_string),
                realm: "BlueWise Platform".into(),
            })),
        )
    }

    fn auth_headers(user: &str, pass: &str) -> HeaderMap {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        let mut h = HeaderMap::new();
        h.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {token}")).unwrap(),
        );
        h
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    struct RefreshingProvider {
        fail: bool,
    }

    #[async_trait]
    impl IdentityProvider for RefreshingProvider {
        fn name(&self) -> &'static str {
            "refreshing"
        }

        async fn read_session(
            &self,
            cookies: &RequestCookies,
        ) -> Result<SessionLookup, IdentityError> {
            if self.fail {
                return Err(IdentityError::Transport("timeout".into()));
            }
            let refreshed = vec![CookieMutation::Set {
                name: "sb".into(),
                value: "rotated".into(),
                max_age_seconds: Some(10),
            }];
            match cookies.get("sb") {
                Some("good") => Ok(SessionLookup {
                    session: Some(Session {
                        user_id: Uuid::nil(),
                        email: Some("owner@example.com".into()),
                        access_token: "a".into(),
                        refresh_token: "r".into(),
                        expires_at: 0,
                    }),
                    cookies: refreshed,
                }),
                _ => Ok(SessionLookup {
                    session: None,
                    cookies: vec![CookieMutation::Remove { name: "sb".into() }],
                }),
            }
        }

        async fn establish_session(
            &self,
            _cookies: &RequestCookies,
            _access_token: &str,
            _refresh_token: &str,
        ) -> Result<SessionLookup, IdentityError> {
            Ok(SessionLookup::none())
        }
    }

    fn session_gate(fail: bool) -> Gate {
        Gate::new(
            RouteRules::for_mode(GateMode::Session, "/platform/login"),
            Verifier::Session(SessionVerifier::new(
                "/platform/login",
                Some(Arc::new(RefreshingProvider { fail })),
            )),
        )
    }

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        h
    }

    // ── basic mode ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_basic_protected_without_credential_challenges() {
        let gate = basic_gate(Some("admin"), Some("correctpass"));
        for path in routes::PROTECTED_PREFIXES {
            let out = gate.evaluate(&uri(path), &HeaderMap::new()).await;
            assert_eq!(
                out.decision,
                GateDecision::Challenge {
                    realm: "BlueWise Platform".into()
                },
                "{path}"
            );
            assert!(out.cookies.is_empty());
        }
    }

    #[tokio::test]
    async fn test_basic_public_and_unclassified_allow() {
        let gate = basic_gate(None, None);
        for path in ["/api/contact", "/", "/about", "/health"] {
            let out = gate.evaluate(&uri(path), &HeaderMap::new()).await;
            assert_eq!(out.decision, GateDecision::Allow, "{path}");
        }
    }

    #[tokio::test]
    async fn test_basic_unconfigured_denies_even_matching_credential() {
        let gate = basic_gate(Some("admin"), None);
        assert!(!gate.is_configured());
        let out = gate
            .evaluate(&uri("/platform"), &auth_headers("admin", ""))
            .await;
        assert_ne!(out.decision, GateDecision::Allow);
    }

    #[tokio::test]
    async fn test_basic_correct_credential_allows() {
        let gate = basic_gate(Some("admin"), Some("correctpass"));
        let out = gate
            .evaluate(&uri("/platform/leads/42"), &auth_headers("admin", "correctpass"))
            .await;
        assert_eq!(out.decision, GateDecision::Allow);
        assert!(out.session.is_none());
    }

    #[tokio::test]
    async fn test_basic_non_ascii_header_denies() {
        let gate = basic_gate(Some("admin"), Some("correctpass"));
        let mut h = HeaderMap::new();
        h.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Basic \xff\xfe").unwrap(),
        );
        let out = gate.evaluate(&uri("/api/leads"), &h).await;
        assert_ne!(out.decision, GateDecision::Allow);
    }

    // ── session mode ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_session_login_page_is_public() {
        let gate = session_gate(true);
        let out = gate
            .evaluate(&uri("/platform/login"), &HeaderMap::new())
            .await;
        assert_eq!(out.decision, GateDecision::Allow);
    }

    #[tokio::test]
    async fn test_session_missing_redirects_with_next() {
        let gate = session_gate(false);
        let out = gate
            .evaluate(&uri("/platform/leads/42"), &HeaderMap::new())
            .await;
        assert_eq!(
            out.decision,
            GateDecision::Redirect {
                location: "/platform/login?next=%2Fplatform%2Fleads%2F42".into()
            }
        );
    }

    #[tokio::test]
    async fn test_session_error_and_absent_share_response_shape() {
        let target = uri("/api/inbox?filter=unread");
        let absent = session_gate(false)
            .evaluate(&target, &cookie_headers("sb=expired"))
            .await;
        let failed = session_gate(true)
            .evaluate(&target, &cookie_headers("sb=good"))
            .await;
        assert_eq!(absent.decision, failed.decision);
        assert_eq!(
            failed.decision,
            GateDecision::Redirect {
                location: "/platform/login?next=%2Fapi%2Finbox%3Ffilter%3Dunread".into()
            }
        );
    }

    #[tokio::test]
    async fn test_session_cookie_mutations_survive_deny() {
        let out = session_gate(false)
            .evaluate(&uri("/platform"), &cookie_headers("sb=expired"))
            .await;
        assert_ne!(out.decision, GateDecision::Allow);
        assert_eq!(out.cookies, vec![CookieMutation::Remove { name: "sb".into() }]);
    }

    #[tokio::test]
    async fn test_session_valid_allows_and_forwards_refresh() {
        let out = session_gate(false)
            .evaluate(&uri("/platform/overview"), &cookie_headers("sb=good"))
            .await;
        assert_eq!(out.decision, GateDecision::Allow);
        assert_eq!(out.cookies.len(), 1);
        assert_eq!(
            out.session.and_then(|s| s.email).as_deref(),
            Some("owner@example.com")
        );
    }

    #[tokio::test]
    async fn test_session_unconfigured_redirects() {
        let gate = Gate::new(
            RouteRules::for_mode(GateMode::Session, "/platform/login"),
            Verifier::Session(SessionVerifier::new("/platform/login", None)),
        );
        assert!(!gate.is_configured());
        let out = gate
            .evaluate(&uri("/platform"), &cookie_headers("sb=good"))
            .await;
        assert!(matches!(out.decision, GateDecision::Redirect { .. }));
    }
}
